//! Key index over a recency-ordered list with a hard capacity.
//!
//! `RecencyIndex` keeps two structures in lockstep: an `FxHashMap<K, SlotId>`
//! for O(1) lookup and an [`IntrusiveList`] ordered from most to least
//! recently touched. Every key in the map has exactly one node in the list
//! and every node's key maps back to that node.
//!
//! ```text
//!   index: FxHashMap<K, SlotId>          order: IntrusiveList<Resident<K, T>>
//!   ┌─────┬────────┐
//!   │  A  │ id_3 ──┼──────────┐          head (MRU)                tail (LRU)
//!   │  B  │ id_1 ──┼─────┐    └────────► [A, g7] ◄──► [C, g5] ◄──► [B, g2]
//!   │  C  │ id_2 ──┼──┐  │                              ▲            ▲
//!   └─────┴────────┘  └──┼──────────────────────────────┘            │
//!                        └───────────────────────────────────────────┘
//! ```
//!
//! Each inserted entry is stamped with a generation drawn from a counter that
//! only moves forward, across `clear` included. A stale holder of a
//! generation can therefore ask for "remove `key`, but only if it is still
//! generation `g`" without risking removal of a newer entry for the same key.
//!
//! A zero capacity is valid: an insertion evicts everything else first, so the
//! index holds at most the most recently inserted entry.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;

/// Upper bound on storage reserved up front; larger capacities grow lazily.
const PREALLOC_LIMIT: usize = 1024;

#[derive(Debug)]
struct Resident<K, T> {
    key: K,
    value: T,
}

/// Result of [`RecencyIndex::touch_or_insert_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Touch<T> {
    /// The resident value for the key, freshly made if `inserted`.
    pub value: T,
    /// Generation stamped on the entry when it was inserted.
    pub generation: u64,
    /// `true` if the key was absent and a new entry was created.
    pub inserted: bool,
    /// Number of least-recently-used entries evicted to make room.
    pub evicted: usize,
}

#[derive(Debug)]
pub struct RecencyIndex<K, T> {
    index: FxHashMap<K, SlotId>,
    order: IntrusiveList<Resident<K, T>>,
    capacity: usize,
    next_generation: u64,
}

impl<K, T> RecencyIndex<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        let reserve = capacity.min(PREALLOC_LIMIT);
        Self {
            index: FxHashMap::with_capacity_and_hasher(reserve, Default::default()),
            order: IntrusiveList::with_capacity(reserve),
            capacity,
            next_generation: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up `key` without changing its recency.
    pub fn peek(&self, key: &K) -> Option<&T> {
        let id = *self.index.get(key)?;
        self.order.get(id).map(|resident| &resident.value)
    }

    /// Returns the generation of the resident entry for `key`.
    pub fn generation(&self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.order.epoch(id)
    }

    /// Moves `key` to the front, or inserts it there if absent.
    ///
    /// On insertion, entries are evicted from the back while the index is at
    /// or above capacity, then `make` builds the value for the new
    /// generation.
    pub fn touch_or_insert_with(&mut self, key: &K, make: impl FnOnce(u64) -> T) -> Touch<T>
    where
        T: Clone,
    {
        if let Some(&id) = self.index.get(key) {
            self.order.move_to_front(id);
            if let Some((resident, generation)) = self.order.get_with_epoch(id) {
                return Touch {
                    value: resident.value.clone(),
                    generation,
                    inserted: false,
                    evicted: 0,
                };
            }
        }

        let evicted = self.evict_until(self.capacity.saturating_sub(1));
        let generation = self.next_generation;
        self.next_generation += 1;

        let value = make(generation);
        let resident = Resident {
            key: key.clone(),
            value: value.clone(),
        };
        let id = self.order.push_front(resident, generation);
        self.index.insert(key.clone(), id);

        Touch {
            value,
            generation,
            inserted: true,
            evicted,
        }
    }

    /// Detaches `key` from both structures; no-op if absent.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        let id = self.index.remove(key)?;
        self.order.remove(id).map(|resident| resident.value)
    }

    /// Removes `key` only if its resident entry is still `generation`.
    pub fn remove_generation(&mut self, key: &K, generation: u64) -> Option<T> {
        if self.generation(key)? != generation {
            return None;
        }
        self.remove(key)
    }

    /// Changes the capacity, evicting from the back until it fits.
    ///
    /// Returns the number of evicted entries.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        self.evict_until(capacity)
    }

    /// Drops every entry. Generations keep counting up.
    pub fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
    }

    /// Iterates resident keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter().map(|resident| &resident.key)
    }

    /// Verifies the index/list bijection and the capacity bound.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.order.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but recency list holds {}",
                self.index.len(),
                self.order.len()
            )));
        }
        self.order.validate_links().map_err(InvariantError::new)?;

        for (id, resident) in self.order.iter_entries() {
            if self.index.get(&resident.key) != Some(&id) {
                return Err(InvariantError::new(format!(
                    "list node {} is not indexed by its key",
                    id.index()
                )));
            }
        }

        if self.len() > self.capacity.max(1) {
            return Err(InvariantError::new(format!(
                "{} resident entries exceed capacity {}",
                self.len(),
                self.capacity
            )));
        }
        Ok(())
    }

    fn evict_until(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() > limit {
            let Some((resident, _)) = self.order.pop_back() else {
                break;
            };
            self.index.remove(&resident.key);
            evicted += 1;
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(index: &mut RecencyIndex<char, u64>, key: char) -> Touch<u64> {
        index.touch_or_insert_with(&key, |generation| generation)
    }

    fn lru_to_mru(index: &RecencyIndex<char, u64>) -> String {
        let mut keys: Vec<char> = index.keys().copied().collect();
        keys.reverse();
        keys.into_iter().collect()
    }

    #[test]
    fn touch_order_scenarios() {
        for (keys, expected) in [
            ("", ""),
            ("ABCD", "ABCD"),
            ("ABA", "BA"),
            ("ABACADA", "BCDA"),
            ("ABCDEFG", "DEFG"),
            ("ABCDAEACCCFG", "ACFG"),
        ] {
            let mut index = RecencyIndex::new(4);
            for key in keys.chars() {
                touch(&mut index, key);
            }
            assert_eq!(lru_to_mru(&index), expected, "sequence {keys:?}");
            index.check_invariants().unwrap();
        }
    }

    #[test]
    fn hit_keeps_generation_and_value() {
        let mut index = RecencyIndex::new(2);
        let first = touch(&mut index, 'a');
        assert!(first.inserted);

        let again = touch(&mut index, 'a');
        assert!(!again.inserted);
        assert_eq!(again.generation, first.generation);
        assert_eq!(again.value, first.value);
        assert_eq!(again.evicted, 0);
    }

    #[test]
    fn insert_reports_evictions() {
        let mut index = RecencyIndex::new(2);
        touch(&mut index, 'a');
        touch(&mut index, 'b');
        let c = touch(&mut index, 'c');

        assert!(c.inserted);
        assert_eq!(c.evicted, 1);
        assert!(!index.contains(&'a'));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn reinsert_after_remove_is_new_generation() {
        let mut index = RecencyIndex::new(4);
        let old = touch(&mut index, 'k');
        assert_eq!(index.remove(&'k'), Some(old.value));
        assert_eq!(index.remove(&'k'), None);

        let new = touch(&mut index, 'k');
        assert!(new.inserted);
        assert!(new.generation > old.generation);
    }

    #[test]
    fn stale_generation_cannot_remove_newer_entry() {
        let mut index = RecencyIndex::new(4);
        let old = touch(&mut index, 'k');
        index.clear();
        let new = touch(&mut index, 'k');

        assert_eq!(index.remove_generation(&'k', old.generation), None);
        assert!(index.contains(&'k'));
        assert_eq!(
            index.remove_generation(&'k', new.generation),
            Some(new.value)
        );
        assert!(index.is_empty());
    }

    #[test]
    fn zero_capacity_holds_only_latest_insert() {
        let mut index = RecencyIndex::new(0);
        touch(&mut index, 'a');
        assert_eq!(index.len(), 1);

        let b = touch(&mut index, 'b');
        assert_eq!(b.evicted, 1);
        assert_eq!(lru_to_mru(&index), "b");
        index.check_invariants().unwrap();
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let mut index = RecencyIndex::new(4);
        for key in "ABCD".chars() {
            touch(&mut index, key);
        }
        assert_eq!(index.set_capacity(2), 2);
        assert_eq!(lru_to_mru(&index), "CD");
        assert_eq!(index.capacity(), 2);

        assert_eq!(index.set_capacity(8), 0);
        assert_eq!(lru_to_mru(&index), "CD");
        index.check_invariants().unwrap();
    }

    #[test]
    fn peek_does_not_touch() {
        let mut index = RecencyIndex::new(2);
        touch(&mut index, 'a');
        touch(&mut index, 'b');

        assert!(index.peek(&'a').is_some());
        touch(&mut index, 'c');
        assert!(!index.contains(&'a'));
        assert!(index.peek(&'a').is_none());
    }

    #[test]
    fn huge_capacity_does_not_preallocate() {
        let mut index: RecencyIndex<char, u64> = RecencyIndex::new(usize::MAX);
        touch(&mut index, 'a');
        assert_eq!(index.capacity(), usize::MAX);
        assert_eq!(index.len(), 1);
    }
}
