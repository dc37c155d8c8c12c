//! Path-subnodes: sub-interval restrictions of a path-node.

use crate::arena::{Arena, NodeId};
use crate::error::Result;
use crate::node::PathNode;

/// A restriction of a path-node to a sub-range of its positional interval.
///
/// Holds no state of its own beyond the triple; every other property
/// (length, weight, k-mer chain) is read through `node` from the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathSubnode {
    pub node: NodeId,
    pub sub_first_start: i64,
    pub sub_first_end: i64,
}

impl PathSubnode {
    /// A subnode covering a path-node's entire positional interval.
    pub fn whole(arena: &Arena<PathNode>, node: NodeId) -> Result<Self> {
        let n = arena.get(node)?;
        Ok(PathSubnode { node, sub_first_start: n.first_start, sub_first_end: n.first_end })
    }

    pub fn width(&self) -> i64 {
        self.sub_first_end - self.sub_first_start + 1
    }

    /// Successor subnodes: one per successor of `self.node` whose interval
    /// overlaps `self`'s interval shifted forward by this node's length
    /// (the one-position k-mer overlap that defines a forward edge).
    pub fn next(&self, arena: &Arena<PathNode>) -> Result<Vec<PathSubnode>> {
        let node = arena.get(self.node)?;
        let length = node.length() as i64;
        let shifted_start = self.sub_first_start + length;
        let shifted_end = self.sub_first_end + length;
        let mut out = Vec::new();
        for &succ_id in &node.successors {
            let succ = arena.get(succ_id)?;
            let lo = shifted_start.max(succ.first_start);
            let hi = shifted_end.min(succ.first_end);
            if lo <= hi {
                out.push(PathSubnode { node: succ_id, sub_first_start: lo, sub_first_end: hi });
            }
        }
        Ok(out)
    }

    /// Predecessor subnodes, mirroring [`PathSubnode::next`] in the
    /// backward direction.
    pub fn prev(&self, arena: &Arena<PathNode>) -> Result<Vec<PathSubnode>> {
        let node = arena.get(self.node)?;
        let mut out = Vec::new();
        for &pred_id in &node.predecessors {
            let pred = arena.get(pred_id)?;
            let pred_length = pred.length() as i64;
            let shifted_start = self.sub_first_start - pred_length;
            let shifted_end = self.sub_first_end - pred_length;
            let lo = shifted_start.max(pred.first_start);
            let hi = shifted_end.min(pred.first_end);
            if lo <= hi {
                out.push(PathSubnode { node: pred_id, sub_first_start: lo, sub_first_end: hi });
            }
        }
        Ok(out)
    }
}
