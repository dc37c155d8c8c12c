//! Path-nodes: chains of co-linear k-mers carrying a positional interval.

use crate::arena::{Arena, NodeId};
use crate::error::{Result, SimplifierError};

/// A maximal unbranched chain of k-mers, observed over a range of reference
/// start positions.
///
/// `weights` and `reference_flags` are indexed by position within
/// `[first_start, first_end]`, not by k-mer — every occurrence of the chain
/// carries its own weight and reference flag, independent of how long the
/// chain is.
#[derive(Clone, Debug)]
pub struct PathNode {
    pub kmers: Vec<u64>,
    pub first_start: i64,
    pub first_end: i64,
    pub weights: Vec<u64>,
    pub reference_flags: Vec<bool>,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
}

impl PathNode {
    pub fn width(&self) -> i64 {
        self.first_end - self.first_start + 1
    }

    pub fn length(&self) -> usize {
        self.kmers.len()
    }

    pub fn last_start(&self) -> i64 {
        self.first_start + self.length() as i64 - 1
    }

    pub fn last_end(&self) -> i64 {
        self.first_end + self.length() as i64 - 1
    }

    fn validate(&self) -> Result<()> {
        if self.first_start > self.first_end {
            return Err(SimplifierError::invariant("first_start exceeds first_end"));
        }
        if self.kmers.is_empty() {
            return Err(SimplifierError::invariant("path-node has an empty k-mer chain"));
        }
        let width = self.width() as usize;
        if self.weights.len() != width || self.reference_flags.len() != width {
            return Err(SimplifierError::invariant(
                "weights/reference_flags length does not match positional width",
            ));
        }
        Ok(())
    }
}

fn overlaps(a1: i64, b1: i64, a2: i64, b2: i64) -> bool {
    a1.max(a2) <= b1.min(b2)
}

fn rewire_replace(list: &mut Vec<NodeId>, old: NodeId, news: &[NodeId]) {
    if let Some(pos) = list.iter().position(|x| *x == old) {
        list.remove(pos);
        for &n in news {
            if !list.contains(&n) {
                list.push(n);
            }
        }
    }
}

/// Partition a node of length `L` into a prefix of length `len` and a
/// suffix of length `L - len`. The prefix inherits the original's
/// predecessors, the suffix inherits its successors, and a new prefix→suffix
/// edge is added. Weights and reference flags, being indexed by occurrence
/// position rather than by k-mer, are cloned unchanged into both halves.
pub fn split_at_length(arena: &mut Arena<PathNode>, id: NodeId, len: usize) -> Result<(NodeId, NodeId)> {
    let length = arena.get(id)?.length();
    if len == 0 || len >= length {
        return Err(SimplifierError::invariant(format!(
            "split_at_length: len {} must satisfy 0 < len < {}",
            len, length
        )));
    }
    let original = arena.remove(id)?;
    let shift = len as i64;

    let prefix = PathNode {
        kmers: original.kmers[..len].to_vec(),
        first_start: original.first_start,
        first_end: original.first_end,
        weights: original.weights.clone(),
        reference_flags: original.reference_flags.clone(),
        predecessors: original.predecessors.clone(),
        successors: Vec::new(),
    };
    let suffix = PathNode {
        kmers: original.kmers[len..].to_vec(),
        first_start: original.first_start + shift,
        first_end: original.first_end + shift,
        weights: original.weights.clone(),
        reference_flags: original.reference_flags.clone(),
        predecessors: Vec::new(),
        successors: original.successors.clone(),
    };
    let prefix_id = arena.insert(prefix);
    let suffix_id = arena.insert(suffix);

    arena.get_mut(prefix_id)?.successors.push(suffix_id);
    arena.get_mut(suffix_id)?.predecessors.push(prefix_id);

    for pred in &original.predecessors {
        if let Ok(p) = arena.get_mut(*pred) {
            rewire_replace(&mut p.successors, id, &[prefix_id]);
        }
    }
    for succ in &original.successors {
        if let Ok(s) = arena.get_mut(*succ) {
            rewire_replace(&mut s.predecessors, id, &[suffix_id]);
        }
    }

    arena.get(prefix_id)?.validate()?;
    arena.get(suffix_id)?.validate()?;
    Ok((prefix_id, suffix_id))
}

/// Partition a node of positional interval `[a, b]` into a left node over
/// `[a, p-1]` and a right node over `[p, b]`, both carrying the original's
/// full k-mer chain. Each neighbour edge is rebuilt by intersecting the
/// neighbour's own interval (shifted by the one-position k-mer overlap)
/// with the left and right intervals; an edge survives on whichever side
/// (or both) the intersection is non-empty.
pub fn split_at_start_position(arena: &mut Arena<PathNode>, id: NodeId, p: i64) -> Result<(NodeId, NodeId)> {
    let (a, b) = {
        let node = arena.get(id)?;
        (node.first_start, node.first_end)
    };
    if !(a < p && p <= b) {
        return Err(SimplifierError::invariant(format!(
            "split_at_start_position: p {} must satisfy {} < p <= {}",
            p, a, b
        )));
    }
    let original = arena.remove(id)?;
    let length = original.length() as i64;
    let split_offset = (p - a) as usize;

    let left = PathNode {
        kmers: original.kmers.clone(),
        first_start: a,
        first_end: p - 1,
        weights: original.weights[..split_offset].to_vec(),
        reference_flags: original.reference_flags[..split_offset].to_vec(),
        predecessors: Vec::new(),
        successors: Vec::new(),
    };
    let right = PathNode {
        kmers: original.kmers.clone(),
        first_start: p,
        first_end: b,
        weights: original.weights[split_offset..].to_vec(),
        reference_flags: original.reference_flags[split_offset..].to_vec(),
        predecessors: Vec::new(),
        successors: Vec::new(),
    };
    let left_id = arena.insert(left);
    let right_id = arena.insert(right);

    for &succ_id in &original.successors {
        let (s_start, s_end) = {
            let s = arena.get(succ_id)?;
            (s.first_start, s.first_end)
        };
        let mut news = Vec::new();
        if overlaps(a + length, p - 1 + length, s_start, s_end) {
            news.push(left_id);
            arena.get_mut(left_id)?.successors.push(succ_id);
        }
        if overlaps(p + length, b + length, s_start, s_end) {
            news.push(right_id);
            arena.get_mut(right_id)?.successors.push(succ_id);
        }
        if let Ok(s) = arena.get_mut(succ_id) {
            rewire_replace(&mut s.predecessors, id, &news);
        }
    }

    for &pred_id in &original.predecessors {
        let (p_start, p_end, p_length) = {
            let pn = arena.get(pred_id)?;
            (pn.first_start, pn.first_end, pn.length() as i64)
        };
        let pred_last_start = p_start + p_length - 1;
        let pred_last_end = p_end + p_length - 1;
        let mut news = Vec::new();
        if overlaps(pred_last_start + 1, pred_last_end + 1, a, p - 1) {
            news.push(left_id);
            arena.get_mut(left_id)?.predecessors.push(pred_id);
        }
        if overlaps(pred_last_start + 1, pred_last_end + 1, p, b) {
            news.push(right_id);
            arena.get_mut(right_id)?.predecessors.push(pred_id);
        }
        if let Ok(pn) = arena.get_mut(pred_id) {
            rewire_replace(&mut pn.successors, id, &news);
        }
    }

    arena.get(left_id)?.validate()?;
    arena.get(right_id)?.validate()?;
    Ok((left_id, right_id))
}

/// Merge `source` into `target`. Both must share an identical k-mer chain
/// and positional interval. Weights are summed position-wise, reference
/// flags unioned, and edge lists unioned (deduplicated); `source` is
/// detached from every neighbour and removed from the arena.
pub fn merge_nodes(arena: &mut Arena<PathNode>, target: NodeId, source: NodeId) -> Result<()> {
    {
        let (t, s) = (arena.get(target)?, arena.get(source)?);
        if t.kmers != s.kmers {
            return Err(SimplifierError::invariant("merge: k-mer chains differ"));
        }
        if t.first_start != s.first_start || t.first_end != s.first_end {
            return Err(SimplifierError::invariant("merge: positional intervals differ"));
        }
        if t.length() != s.length() {
            return Err(SimplifierError::invariant("merge: lengths differ"));
        }
    }

    let source_node = arena.remove(source)?;
    {
        let t = arena.get_mut(target)?;
        for (tw, sw) in t.weights.iter_mut().zip(source_node.weights.iter()) {
            *tw += *sw;
        }
        for (tr, sr) in t.reference_flags.iter_mut().zip(source_node.reference_flags.iter()) {
            *tr = *tr || *sr;
        }
        for p in &source_node.predecessors {
            if *p != target && !t.predecessors.contains(p) {
                t.predecessors.push(*p);
            }
        }
        for s in &source_node.successors {
            if *s != target && !t.successors.contains(s) {
                t.successors.push(*s);
            }
        }
    }

    for &pred in &source_node.predecessors {
        if pred == target {
            continue;
        }
        if let Ok(p) = arena.get_mut(pred) {
            rewire_replace(&mut p.successors, source, &[target]);
        }
    }
    for &succ in &source_node.successors {
        if succ == target {
            continue;
        }
        if let Ok(s) = arena.get_mut(succ) {
            rewire_replace(&mut s.predecessors, source, &[target]);
        }
    }

    if let Ok(t) = arena.get_mut(target) {
        t.predecessors.retain(|x| *x != target && *x != source);
        t.successors.retain(|x| *x != target && *x != source);
    }
    Ok(())
}
