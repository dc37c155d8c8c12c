//! The collapse transform: similarity search across two candidate paths,
//! topology acceptance (`tryCollapse`), and the node-splitting/merging
//! surgery that folds one path's weight into the other (`mergePaths`).
//!
//! This is the densest module in the crate: it turns a graph-shaped
//! precondition (two interval-aligned k-mer paths agreeing within budget)
//! into a sequence of concrete, invariant-preserving structural edits.

use std::collections::{BTreeSet, HashMap};

use crate::arena::{Arena, NodeId};
use crate::buffers::{Buffers, Location};
use crate::config::SimplifierConfig;
use crate::cursor::PathTreeCursor;
use crate::error::{Result, SimplifierError};
use crate::kmer;
use crate::node::{self, PathNode};
use crate::subnode::PathSubnode;

/// Count how many of `node_ids` occur more than once.
///
/// A non-zero count here forbids a collapse (Design Notes: split
/// boundaries can't be satisfied by a single node if that node is shared
/// at two different depths of the same candidate pair).
pub fn repeated_kmer_path_node_count(node_ids: &[NodeId]) -> usize {
    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    for id in node_ids {
        *counts.entry(*id).or_insert(0) += 1;
    }
    counts.values().filter(|&&c| c > 1).count()
}

fn chains_of<'a>(arena: &'a Arena<PathNode>, path: &[PathSubnode]) -> Result<Vec<&'a [u64]>> {
    path.iter().map(|s| arena.get(s.node).map(|n| n.kmers.as_slice())).collect()
}

fn sum_body_weight(arena: &Arena<PathNode>, body: &[PathSubnode]) -> Result<u64> {
    let mut total = 0u64;
    for sn in body {
        let node = arena.get(sn.node)?;
        let lo = (sn.sub_first_start - node.first_start) as usize;
        let hi = (sn.sub_first_end - node.first_start) as usize;
        total += node.weights[lo..=hi].iter().sum::<u64>();
    }
    Ok(total)
}

fn is_pure_body(arena: &Arena<PathNode>, body: &[PathSubnode]) -> Result<bool> {
    for sn in body {
        let node = arena.get(sn.node)?;
        if node.predecessors.len() != 1 || node.successors.len() != 1 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Pick which of two equally-topological bodies is the merge source.
///
/// Lighter weight loses; on a weight tie, the lexicographically smaller
/// concatenated base sequence is the source, so the choice is
/// deterministic across runs rather than dependent on arena insertion
/// order.
fn pick_source_target(
    arena: &Arena<PathNode>,
    k: usize,
    body_a: Vec<PathSubnode>,
    weight_a: u64,
    body_b: Vec<PathSubnode>,
    weight_b: u64,
) -> Result<(Vec<PathSubnode>, Vec<PathSubnode>)> {
    if weight_a < weight_b {
        return Ok((body_a, body_b));
    }
    if weight_b < weight_a {
        return Ok((body_b, body_a));
    }
    let bases_a = kmer::concat_path_bases(k, chains_of(arena, &body_a)?);
    let bases_b = kmer::concat_path_bases(k, chains_of(arena, &body_b)?);
    if bases_a <= bases_b {
        Ok((body_a, body_b))
    } else {
        Ok((body_b, body_a))
    }
}

fn path_bases_different(
    arena: &Arena<PathNode>,
    k: usize,
    a: &PathTreeCursor,
    b: &PathTreeCursor,
) -> Result<usize> {
    let path_a = a.current_path();
    let path_b = b.current_path();
    let bases_a = kmer::concat_path_bases(k, chains_of(arena, &path_a)?);
    let bases_b = kmer::concat_path_bases(k, chains_of(arena, &path_b)?);
    let len_a = a.path_length(arena)?;
    let len_b = b.path_length(arena)?;
    Ok(if a.is_forward() {
        kmer::bases_different(k, &bases_a, len_a, &bases_b, len_b)
    } else {
        kmer::reverse_bases_different(k, &bases_a, len_a, &bases_b, len_b)
    })
}

fn repeated_across(root_id: NodeId, path_a: &[PathSubnode], path_b: &[PathSubnode]) -> usize {
    let mut ids = vec![root_id];
    ids.extend(path_a.iter().map(|s| s.node));
    ids.extend(path_b.iter().map(|s| s.node));
    repeated_kmer_path_node_count(&ids)
}

/// Replace a node id with its replacements in whichever buffer it occupied.
fn replace_in_buffers(
    buffers: &mut Buffers,
    arena: &Arena<PathNode>,
    old: NodeId,
    news: &[NodeId],
) -> Result<()> {
    let loc = buffers.location_of(old);
    buffers.remove(old);
    if let Some(loc) = loc {
        for &n in news {
            buffers.insert_at(arena, n, loc)?;
        }
    }
    Ok(())
}

/// Drop the leading `skip` k-mers from `path`, length-splitting the first
/// node if the cut falls mid-node. `skip == 0` is an accepted no-op.
fn trim_start_kmers(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    path: &mut Vec<PathSubnode>,
    mut skip: usize,
) -> Result<()> {
    while skip > 0 {
        let head = *path
            .first()
            .ok_or_else(|| SimplifierError::invariant("trim_start_kmers: skip exceeds path length"))?;
        let head_len = arena.get(head.node)?.length();
        if skip >= head_len {
            skip -= head_len;
            path.remove(0);
        } else {
            let (prefix_id, suffix_id) = node::split_at_length(arena, head.node, skip)?;
            replace_in_buffers(buffers, arena, head.node, &[prefix_id, suffix_id])?;
            path[0] = PathSubnode {
                node: suffix_id,
                sub_first_start: head.sub_first_start + skip as i64,
                sub_first_end: head.sub_first_end + skip as i64,
            };
            skip = 0;
        }
    }
    Ok(())
}

/// Split `sub.node` (if necessary) so that a single node's positional
/// interval is exactly `[sub.sub_first_start, sub.sub_first_end]`, and
/// return that node's id.
fn position_split_to_subnode(arena: &mut Arena<PathNode>, buffers: &mut Buffers, sub: PathSubnode) -> Result<NodeId> {
    let mut current = sub.node;
    let (mut cur_start, mut cur_end) = {
        let n = arena.get(current)?;
        (n.first_start, n.first_end)
    };
    if sub.sub_first_start > cur_start {
        let (left, right) = node::split_at_start_position(arena, current, sub.sub_first_start)?;
        replace_in_buffers(buffers, arena, current, &[left, right])?;
        current = right;
        cur_start = sub.sub_first_start;
        cur_end = arena.get(current)?.first_end;
    }
    let _ = cur_start;
    if sub.sub_first_end < cur_end {
        let (left, right) = node::split_at_start_position(arena, current, sub.sub_first_end + 1)?;
        replace_in_buffers(buffers, arena, current, &[left, right])?;
        current = left;
    }
    Ok(current)
}

/// Split whichever node in `path` straddles `boundary` (a cumulative
/// k-mer-count offset from the start of the path) so that `boundary`
/// becomes a node edge.
fn split_path_at_boundary(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    path: &mut Vec<PathSubnode>,
    boundary: usize,
) -> Result<()> {
    let mut acc = 0usize;
    for i in 0..path.len() {
        let sn = path[i];
        let len = arena.get(sn.node)?.length();
        if boundary > acc && boundary < acc + len {
            let offset = boundary - acc;
            let (left, right) = node::split_at_length(arena, sn.node, offset)?;
            replace_in_buffers(buffers, arena, sn.node, &[left, right])?;
            let left_sub = PathSubnode::whole(arena, left)?;
            let right_sub = PathSubnode::whole(arena, right)?;
            path[i] = left_sub;
            path.insert(i + 1, right_sub);
            return Ok(());
        }
        acc += len;
    }
    Ok(())
}

fn align_lengths(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    path: &mut Vec<PathSubnode>,
    boundaries: &[usize],
) -> Result<()> {
    for &b in boundaries {
        split_path_at_boundary(arena, buffers, path, b)?;
    }
    Ok(())
}

/// Fold `source_path`'s weight into `target_path`, per the four steps of
/// merge-paths: trim, position-split, length-align, merge.
pub fn merge_paths(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    mut source_path: Vec<PathSubnode>,
    mut target_path: Vec<PathSubnode>,
    source_skip: usize,
    target_skip: usize,
) -> Result<()> {
    trim_start_kmers(arena, buffers, &mut source_path, source_skip)?;
    trim_start_kmers(arena, buffers, &mut target_path, target_skip)?;

    for i in 0..source_path.len() {
        let exact = position_split_to_subnode(arena, buffers, source_path[i])?;
        source_path[i] = PathSubnode::whole(arena, exact)?;
    }
    for i in 0..target_path.len() {
        let exact = position_split_to_subnode(arena, buffers, target_path[i])?;
        target_path[i] = PathSubnode::whole(arena, exact)?;
    }

    let mut boundaries: BTreeSet<usize> = BTreeSet::new();
    let mut acc = 0;
    for sn in &source_path {
        acc += arena.get(sn.node)?.length();
        boundaries.insert(acc);
    }
    let source_total = acc;
    acc = 0;
    for sn in &target_path {
        acc += arena.get(sn.node)?.length();
        boundaries.insert(acc);
    }
    let target_total = acc;
    if source_total != target_total {
        return Err(SimplifierError::invariant(
            "merge_paths: source and target paths have different total lengths",
        ));
    }
    boundaries.remove(&source_total);
    let boundaries: Vec<usize> = boundaries.into_iter().collect();

    align_lengths(arena, buffers, &mut source_path, &boundaries)?;
    align_lengths(arena, buffers, &mut target_path, &boundaries)?;

    if source_path.len() != target_path.len() {
        return Err(SimplifierError::invariant("merge_paths: node counts did not align"));
    }
    for (src, tgt) in source_path.iter().zip(target_path.iter()) {
        node::merge_nodes(arena, tgt.node, src.node)?;
        buffers.remove(src.node);
    }
    Ok(())
}

fn try_bubble_collapse(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
    a: &mut PathTreeCursor,
    b: &mut PathTreeCursor,
) -> Result<bool> {
    if a.tip().node != b.tip().node {
        return Ok(false);
    }
    if a.path_length(arena)? != b.path_length(arena)? {
        return Ok(false);
    }

    let mut body_a = a.current_path();
    body_a.pop();
    let mut body_b = b.current_path();
    body_b.pop();
    if body_a.is_empty() || body_b.is_empty() {
        return Ok(false);
    }
    if repeated_across(root_id, &body_a, &body_b) != 0 {
        return Ok(false);
    }

    let weight_a = sum_body_weight(arena, &body_a)?;
    let weight_b = sum_body_weight(arena, &body_b)?;
    let (source_body, target_body) = pick_source_target(arena, config.k, body_a, weight_a, body_b, weight_b)?;
    if config.bubbles_and_leaves_only && !is_pure_body(arena, &source_body)? {
        return Ok(false);
    }
    merge_paths(arena, buffers, source_body, target_body, 0, 0)?;
    Ok(true)
}

fn try_leaf_collapse(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
    leaf: &mut PathTreeCursor,
    target: &mut PathTreeCursor,
) -> Result<bool> {
    let leaf_tip = leaf.tip();
    let is_dead_end = {
        let children = if leaf.is_forward() { leaf_tip.next(arena)? } else { leaf_tip.prev(arena)? };
        children.is_empty()
    };
    if !is_dead_end {
        return Ok(false);
    }

    let leaf_len = leaf.path_length(arena)?;
    let target_len = target.path_length(arena)?;
    let leaf_weight = leaf.path_weight(arena)?;
    let target_weight = target.path_weight(arena)?;
    if leaf_len > target_len || leaf_weight > target_weight {
        return Ok(false);
    }

    let leaf_body = leaf.current_path();
    let target_body = target.current_path();
    if repeated_across(root_id, &leaf_body, &target_body) != 0 {
        return Ok(false);
    }

    let target_skip = if target.is_forward() { 0 } else { target_len - leaf_len };
    merge_paths(arena, buffers, leaf_body, target_body, 0, target_skip)?;
    Ok(true)
}

fn try_collapse(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
    a: &mut PathTreeCursor,
    b: &mut PathTreeCursor,
    find_common_child: bool,
) -> Result<bool> {
    if find_common_child && try_bubble_collapse(arena, buffers, config, root_id, a, b)? {
        return Ok(true);
    }
    if try_leaf_collapse(arena, buffers, config, root_id, a, b)? {
        return Ok(true);
    }
    if try_leaf_collapse(arena, buffers, config, root_id, b, a)? {
        return Ok(true);
    }
    Ok(false)
}

/// Walk two candidate path-tree cursors outward from `root_id` until they
/// converge on a collapsible topology, their intervals stop overlapping, or
/// their bases diverge past the mismatch budget.
pub fn collapse_similar_path(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
    a: &mut PathTreeCursor,
    b: &mut PathTreeCursor,
    find_common_child: bool,
) -> Result<bool> {
    let mut cursors: [&mut PathTreeCursor; 2] = [a, b];
    loop {
        let tip_0 = cursors[0].tip();
        let tip_1 = cursors[1].tip();
        let lo = tip_0.sub_first_start.max(tip_1.sub_first_start);
        let hi = tip_0.sub_first_end.min(tip_1.sub_first_end);
        if lo > hi {
            return Ok(false);
        }

        let mismatches = path_bases_different(arena, config.k, cursors[0], cursors[1])?;
        if mismatches > config.max_bases_mismatch {
            return Ok(false);
        }

        if try_collapse(arena, buffers, config, root_id, cursors[0], cursors[1], find_common_child)? {
            return Ok(true);
        }

        let shorter = if cursors[0].path_length(arena)? <= cursors[1].path_length(arena)? { 0 } else { 1 };
        loop {
            if !cursors[shorter].dfs_next_child(arena)? {
                return Ok(false);
            }
            if repeated_across(root_id, &cursors[0].current_path(), &cursors[1].current_path()) == 0 {
                break;
            }
            cursors[shorter].dfs_pop();
        }
    }
}

fn attempt_pair(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
    node_i: NodeId,
    node_j: NodeId,
    forward: bool,
) -> Result<bool> {
    let sub_i = PathSubnode::whole(arena, node_i)?;
    let sub_j = PathSubnode::whole(arena, node_j)?;
    let mut cursor_a = PathTreeCursor::new(sub_i, forward, config.max_path_collapse_length);
    let mut cursor_b = PathTreeCursor::new(sub_j, forward, config.max_path_collapse_length);
    // The reverse (predecessor) pass never looks for a common child: it only
    // ever attempts a leaf collapse.
    collapse_similar_path(arena, buffers, config, root_id, &mut cursor_a, &mut cursor_b, forward)
}

/// Try every unordered pair of successors (forward) and then every
/// unordered pair of predecessors (reverse) of `root_id`, returning as soon
/// as one pair collapses.
pub fn collapse_attempt(
    arena: &mut Arena<PathNode>,
    buffers: &mut Buffers,
    config: &SimplifierConfig,
    root_id: NodeId,
) -> Result<bool> {
    let successors = arena.get(root_id)?.successors.clone();
    for i in 0..successors.len() {
        for j in (i + 1)..successors.len() {
            if attempt_pair(arena, buffers, config, root_id, successors[i], successors[j], true)? {
                return Ok(true);
            }
        }
    }

    let predecessors = arena.get(root_id)?.predecessors.clone();
    for i in 0..predecessors.len() {
        for j in (i + 1)..predecessors.len() {
            if attempt_pair(arena, buffers, config, root_id, predecessors[i], predecessors[j], false)? {
                return Ok(true);
            }
        }
    }

    Ok(false)
}
