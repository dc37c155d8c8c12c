//! Depth-first walk over paths reachable from a starting subnode.

use crate::arena::Arena;
use crate::error::Result;
use crate::node::PathNode;
use crate::subnode::PathSubnode;

struct Frame {
    subnode: PathSubnode,
    children: Option<Vec<PathSubnode>>,
    child_index: usize,
}

/// A bounded depth-first traversal rooted at a subnode.
///
/// `forward` selects the traversal direction: `true` walks successors
/// (`PathSubnode::next`), `false` walks predecessors (`PathSubnode::prev`).
/// The stack is never extended past `max_collapse_length` total k-mers
/// (summed across the underlying nodes of every frame), so the traversal
/// cannot run away on a long unbroken chain.
pub struct PathTreeCursor {
    stack: Vec<Frame>,
    forward: bool,
    max_collapse_length: usize,
}

impl PathTreeCursor {
    pub fn new(root: PathSubnode, forward: bool, max_collapse_length: usize) -> Self {
        Self {
            stack: vec![Frame { subnode: root, children: None, child_index: 0 }],
            forward,
            max_collapse_length,
        }
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn max_collapse_length(&self) -> usize {
        self.max_collapse_length
    }

    /// Sum of the underlying nodes' k-mer-chain lengths along the stack.
    pub fn path_length(&self, arena: &Arena<PathNode>) -> Result<usize> {
        let mut total = 0;
        for frame in &self.stack {
            total += arena.get(frame.subnode.node)?.length();
        }
        Ok(total)
    }

    /// Sum of per-position weights, restricted to each frame's subnode
    /// interval, along the stack.
    pub fn path_weight(&self, arena: &Arena<PathNode>) -> Result<u64> {
        let mut total = 0u64;
        for frame in &self.stack {
            let node = arena.get(frame.subnode.node)?;
            let lo = (frame.subnode.sub_first_start - node.first_start) as usize;
            let hi = (frame.subnode.sub_first_end - node.first_start) as usize;
            total += node.weights[lo..=hi].iter().sum::<u64>();
        }
        Ok(total)
    }

    /// The ordered list of head subnodes, root to tip.
    pub fn current_path(&self) -> Vec<PathSubnode> {
        self.stack.iter().map(|f| f.subnode).collect()
    }

    pub fn tip(&self) -> PathSubnode {
        self.stack.last().expect("cursor stack is never empty").subnode
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push the next unvisited child of the tip, skipping any child that
    /// would push `path_length` past `max_collapse_length`. Returns `false`
    /// once the tip's children (within the length bound) are exhausted.
    pub fn dfs_next_child(&mut self, arena: &Arena<PathNode>) -> Result<bool> {
        let current_length = self.path_length(arena)?;
        loop {
            let tip = self.stack.last_mut().expect("cursor stack is never empty");
            if tip.children.is_none() {
                let computed = if self.forward { tip.subnode.next(arena)? } else { tip.subnode.prev(arena)? };
                tip.children = Some(computed);
            }
            let children = tip.children.as_ref().unwrap();
            if tip.child_index >= children.len() {
                return Ok(false);
            }
            let candidate = children[tip.child_index];
            tip.child_index += 1;
            let candidate_length = arena.get(candidate.node)?.length();
            if current_length + candidate_length > self.max_collapse_length {
                continue;
            }
            self.stack.push(Frame { subnode: candidate, children: None, child_index: 0 });
            return Ok(true);
        }
    }

    /// Pop the tip, returning its subnode. Never pops the root frame.
    pub fn dfs_pop(&mut self) -> Option<PathSubnode> {
        if self.stack.len() <= 1 {
            return None;
        }
        self.stack.pop().map(|f| f.subnode)
    }

    /// Reset child enumeration at the tip, forcing the next `dfs_next_child`
    /// call to recompute the child list.
    pub fn dfs_reset_child_traversal(&mut self) {
        if let Some(tip) = self.stack.last_mut() {
            tip.children = None;
            tip.child_index = 0;
        }
    }

    /// Descend along successive first-children until a node with no further
    /// children in the traversal direction is reached. Does not mutate the
    /// cursor. Returns `None` if the descent would exceed
    /// `max_collapse_length` before a leaf is reached.
    pub fn first_terminal_leaf(&self, arena: &Arena<PathNode>) -> Result<Option<PathSubnode>> {
        let mut current = self.tip();
        let mut total_length = self.path_length(arena)?;
        loop {
            let children = if self.forward { current.next(arena)? } else { current.prev(arena)? };
            let Some(&child) = children.first() else {
                return Ok(Some(current));
            };
            total_length += arena.get(child.node)?.length();
            if total_length > self.max_collapse_length {
                return Ok(None);
            }
            current = child;
        }
    }
}
