//! The two ordered buffers the streaming scheduler migrates nodes between.

use std::collections::{BTreeSet, HashMap};

use crate::arena::{Arena, NodeId};
use crate::node::PathNode;

/// An ordered collection of `NodeId`s keyed by `K`, supporting O(log n)
/// insert, min-peek/pop, and removal-by-id.
///
/// Modeled on a sliding lookback buffer generalized from FIFO order to an arbitrary sort
/// key since both `unprocessed` and `processed` need order keys derived
/// from node state that changes across splits and merges, not pure arrival
/// order. A `BTreeSet<(K, NodeId)>` gives the ordering; a side `HashMap`
/// records each id's current key so it can be found and removed from the
/// set without a linear scan.
pub struct OrderedBuffer<K: Ord + Copy> {
    by_key: BTreeSet<(K, NodeId)>,
    key_of: HashMap<NodeId, K>,
}

impl<K: Ord + Copy> Default for OrderedBuffer<K> {
    fn default() -> Self {
        Self { by_key: BTreeSet::new(), key_of: HashMap::new() }
    }
}

impl<K: Ord + Copy> OrderedBuffer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.key_of.contains_key(&id)
    }

    /// Insert `id` under `key`. If `id` was already present under a
    /// different key, the old entry is dropped first — this is how a
    /// mutation (split/merge) re-inserts a node so its ordering stays
    /// correct after its key changes.
    pub fn insert(&mut self, key: K, id: NodeId) {
        self.remove(id);
        self.by_key.insert((key, id));
        self.key_of.insert(id, key);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<K> {
        if let Some(key) = self.key_of.remove(&id) {
            self.by_key.remove(&(key, id));
            Some(key)
        } else {
            None
        }
    }

    pub fn peek_min(&self) -> Option<(K, NodeId)> {
        self.by_key.iter().next().copied()
    }

    pub fn pop_min(&mut self) -> Option<(K, NodeId)> {
        let entry = self.peek_min()?;
        self.remove(entry.1);
        Some(entry)
    }
}

/// Sort key for the `unprocessed` buffer: `(lastEnd, lastStart, lastKmer)`.
pub type UnprocessedKey = (i64, i64, u64);

/// Sort key for the `processed` buffer: `(firstStart, firstEnd, firstKmer)`.
pub type ProcessedKey = (i64, i64, u64);

pub fn unprocessed_key(node: &PathNode) -> UnprocessedKey {
    (node.last_end(), node.last_start(), *node.kmers.last().expect("non-empty chain"))
}

pub fn processed_key(node: &PathNode) -> ProcessedKey {
    (node.first_start, node.first_end, node.kmers[0])
}

/// The two ordered buffers a path-node migrates between on its way from
/// the upstream iterator to the downstream consumer.
#[derive(Default)]
pub struct Buffers {
    pub unprocessed: OrderedBuffer<UnprocessedKey>,
    pub processed: OrderedBuffer<ProcessedKey>,
}

/// Which of the two buffers a node currently occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Unprocessed,
    Processed,
}

impl Buffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location_of(&self, id: NodeId) -> Option<Location> {
        if self.unprocessed.contains(id) {
            Some(Location::Unprocessed)
        } else if self.processed.contains(id) {
            Some(Location::Processed)
        } else {
            None
        }
    }

    pub fn insert_at(&mut self, arena: &Arena<PathNode>, id: NodeId, loc: Location) -> crate::error::Result<()> {
        match loc {
            Location::Unprocessed => self.insert_unprocessed(arena, id),
            Location::Processed => self.insert_processed(arena, id),
        }
    }

    /// Insert `id` into `unprocessed`, deriving its key from the arena.
    pub fn insert_unprocessed(&mut self, arena: &Arena<PathNode>, id: NodeId) -> crate::error::Result<()> {
        let key = unprocessed_key(arena.get(id)?);
        self.unprocessed.insert(key, id);
        Ok(())
    }

    /// Insert `id` into `processed`, deriving its key from the arena.
    pub fn insert_processed(&mut self, arena: &Arena<PathNode>, id: NodeId) -> crate::error::Result<()> {
        let key = processed_key(arena.get(id)?);
        self.processed.insert(key, id);
        Ok(())
    }

    /// Re-insert `id` into whichever of the two buffers it currently
    /// occupies (or neither, if it has already been emitted/removed),
    /// recomputing its key from current arena state. Used after a split or
    /// merge mutates a node that might be sitting in either buffer.
    pub fn reinsert(&mut self, arena: &Arena<PathNode>, id: NodeId) -> crate::error::Result<()> {
        if self.unprocessed.contains(id) {
            self.insert_unprocessed(arena, id)?;
        } else if self.processed.contains(id) {
            self.insert_processed(arena, id)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) {
        self.unprocessed.remove(id);
        self.processed.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_buffer_pops_in_key_order() {
        let mut buf: OrderedBuffer<i64> = OrderedBuffer::new();
        let ids: Vec<NodeId> = {
            let mut arena: Arena<()> = Arena::new();
            (0..3).map(|_| arena.insert(())).collect()
        };
        buf.insert(30, ids[0]);
        buf.insert(10, ids[1]);
        buf.insert(20, ids[2]);
        assert_eq!(buf.pop_min().unwrap().0, 10);
        assert_eq!(buf.pop_min().unwrap().0, 20);
        assert_eq!(buf.pop_min().unwrap().0, 30);
        assert!(buf.is_empty());
    }

    #[test]
    fn reinsert_moves_entry_to_new_key() {
        let mut buf: OrderedBuffer<i64> = OrderedBuffer::new();
        let mut arena: Arena<()> = Arena::new();
        let id = arena.insert(());
        buf.insert(5, id);
        buf.insert(1, id);
        assert_eq!(buf.len(), 1, "re-inserting the same id replaces its old key");
        assert_eq!(buf.peek_min().unwrap().0, 1);
    }
}
