//! # Loading LRU cache with single-flight misses
//!
//! [`LoadingCache`] maps keys to values produced by a user-supplied
//! [`Loader`]. It holds at most `capacity` entries, evicting the least
//! recently used one first, and collapses concurrent requests for the same
//! missing key into a single loader call whose outcome every requester sees.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                       LoadingCache<K, V, E>                          │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  Arc<RwLock<RecencyIndex<K, Arc<LoadSlot<V, E>>>>>           │   │
//!   │   │                                                              │   │
//!   │   │  FxHashMap<K, SlotId> ──► IntrusiveList (MRU ─► LRU)         │   │
//!   │   │                             [k3, g9] ◄──► [k1, g4] ◄──► ...  │   │
//!   │   │                                │             │               │   │
//!   │   └────────────────────────────────┼─────────────┼───────────────┘   │
//!   │                                    ▼             ▼                   │
//!   │                           LoadSlot (g9)    LoadSlot (g4)             │
//!   │                           Loading          Completed(Arc<V>)         │
//!   │                                                                      │
//!   │   Arc<dyn Loader<K, V, E>>  ◄── called with NO lock held             │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## `get` flow
//!
//! ```text
//!   get(k)
//!     │
//!     ├─ write lock ─► touch_or_insert(k)        evict LRU while full,
//!     │                 └─ new entry? ─► new LoadSlot for generation g
//!     ├─ unlock
//!     │
//!     └─ slot.acquire()
//!          ├─ Leader    ─► loader.load(k)         (no structural lock)
//!          │               ├─ write lock ─► failed or capacity 0?
//!          │               │                 remove k if still generation g
//!          │               └─ publish outcome, wake waiters
//!          ├─ Ready     ─► shared Ok(Arc<V>) / Err(E)
//!          └─ Abandoned ─► purge generation g, start over
//! ```
//!
//! ## Method summary
//!
//! | Method              | Lock   | Description                                   |
//! |---------------------|--------|-----------------------------------------------|
//! | `get(&k)`           | Write  | Value for `k`, loading it at most once        |
//! | `peek(&k)`          | Read   | Loaded value without touching recency        |
//! | `contains(&k)`      | Read   | Resident, whether loaded or still loading     |
//! | `keys()`            | Read   | Resident keys, most recently used first       |
//! | `invalidate(&k)`    | Write  | Drop `k`; an in-flight load still completes   |
//! | `set_capacity(n)`   | Write  | Resize, evicting from the LRU end             |
//! | `reset()`           | Write  | Drop every entry                              |
//! | `len()`             | Read   | Resident entries                              |
//! | `capacity()`        | Read   | Configured capacity                           |
//!
//! ## Generations
//!
//! Every inserted entry is stamped with a fresh generation. Work that
//! finishes after the structural lock was released (failure cleanup,
//! zero-capacity eviction, panic recovery) only removes the entry it started
//! from. After a `reset`, an `invalidate`, or an eviction followed by a
//! reload, an old load can no longer touch the key's newer entry.
//!
//! ## Capacity 0
//!
//! A zero-capacity cache retains nothing: an entry lives only while its load
//! runs, so concurrent callers still share one loader call, but the next
//! request after completion loads again.
//!
//! ## Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use oncelru::cache::LoadingCache;
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let cache = LoadingCache::new(2, move |key: &u32| -> Result<String, String> {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(format!("value-{key}"))
//! });
//!
//! assert_eq!(*cache.get(&1).unwrap(), "value-1");
//! assert_eq!(*cache.get(&1).unwrap(), "value-1");
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//!
//! cache.get(&2).unwrap();
//! cache.get(&3).unwrap(); // evicts 1
//! assert!(!cache.contains(&1));
//! assert_eq!(cache.keys(), vec![3, 2]);
//! ```

use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ds::load_slot::{Acquire, LoadGuard, LoadSlot};
use crate::ds::recency_index::RecencyIndex;
use crate::error::InvariantError;
use crate::traits::Loader;

type Entries<K, V, E> = RecencyIndex<K, Arc<LoadSlot<V, E>>>;

/// Thread-safe LRU cache that loads missing keys through a [`Loader`].
///
/// Cloning is cheap and yields another handle to the same cache.
pub struct LoadingCache<K, V, E> {
    entries: Arc<RwLock<Entries<K, V, E>>>,
    loader: Arc<dyn Loader<K, V, E>>,
}

impl<K, V, E> LoadingCache<K, V, E>
where
    K: Eq + Hash + Clone,
    E: Clone,
{
    /// Creates a cache holding at most `capacity` entries, filled by `loader`.
    ///
    /// A capacity of 0 is valid and turns the cache into a pure
    /// request-coalescing layer.
    ///
    /// ```
    /// use oncelru::cache::LoadingCache;
    ///
    /// let cache = LoadingCache::new(16, |key: &String| -> Result<usize, ()> { Ok(key.len()) });
    /// assert_eq!(cache.capacity(), 16);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new<F>(capacity: usize, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::with_loader(capacity, loader)
    }

    /// Creates a cache from any [`Loader`] implementation.
    pub fn with_loader(capacity: usize, loader: impl Loader<K, V, E> + 'static) -> Self {
        Self::from_parts(capacity, Arc::new(loader))
    }

    pub(crate) fn from_parts(capacity: usize, loader: Arc<dyn Loader<K, V, E>>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(RecencyIndex::new(capacity))),
            loader,
        }
    }

    /// Returns the value for `key`, loading it if it is not resident.
    ///
    /// Concurrent calls for the same missing key run the loader once; all of
    /// them receive the same `Arc<V>` or a clone of the same error. A failed
    /// load is not cached: the next call for `key` loads again.
    ///
    /// If the loader panics, the panic propagates to the caller that ran it.
    /// Callers that were waiting on that load retry with a fresh one.
    pub fn get(&self, key: &K) -> Result<Arc<V>, E> {
        loop {
            let slot = self.touch(key);
            let generation = slot.generation();
            let acquired = slot.acquire();
            match acquired {
                Acquire::Leader(guard) => return self.load(key, generation, guard),
                Acquire::Ready(outcome) => return outcome,
                Acquire::Abandoned => {
                    tracing::debug!(generation, "previous load was abandoned, retrying");
                    self.entries.write().remove_generation(key, generation);
                },
            };
        }
    }

    fn touch(&self, key: &K) -> Arc<LoadSlot<V, E>> {
        let mut entries = self.entries.write();
        let touch =
            entries.touch_or_insert_with(key, |generation| Arc::new(LoadSlot::new(generation)));
        if touch.inserted {
            tracing::trace!(
                generation = touch.generation,
                evicted = touch.evicted,
                "inserted entry for missing key"
            );
        }
        touch.value
    }

    fn load(&self, key: &K, generation: u64, guard: LoadGuard<'_, V, E>) -> Result<Arc<V>, E> {
        tracing::trace!(generation, "loading missing entry");

        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.loader.load(key))) {
            Ok(result) => result,
            Err(payload) => {
                tracing::debug!(generation, "loader panicked, discarding entry");
                self.entries.write().remove_generation(key, generation);
                drop(guard);
                panic::resume_unwind(payload);
            },
        };

        // Before publishing, so a waiter that retries on error finds no entry.
        self.settle(key, generation, result.is_err());
        guard.complete(result)
    }

    fn settle(&self, key: &K, generation: u64, failed: bool) {
        let mut entries = self.entries.write();
        if failed {
            if entries.remove_generation(key, generation).is_some() {
                tracing::debug!(generation, "load failed, discarding entry");
            }
        } else if entries.capacity() == 0 {
            entries.remove_generation(key, generation);
        }
    }

    /// Returns the loaded value for `key` without changing its recency.
    ///
    /// Never invokes the loader and never blocks on an in-flight load.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.entries.read().peek(key).and_then(|slot| slot.peek())
    }

    /// Returns `true` if `key` is resident, including while it is loading.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains(key)
    }

    /// Returns the resident keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    /// Removes `key`. Returns `false` if it was not resident.
    ///
    /// A load already running for `key` still delivers its outcome to its
    /// waiters, but the next `get` starts a new one.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Changes the capacity. Shrinking evicts least recently used entries
    /// immediately.
    pub fn set_capacity(&self, capacity: usize) {
        let evicted = self.entries.write().set_capacity(capacity);
        tracing::debug!(capacity, evicted, "cache capacity changed");
    }

    /// Drops every entry.
    ///
    /// Loads in flight are not cancelled. Their waiters still receive the
    /// outcome, but it is never stored in the cache.
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "cache reset");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.read().capacity()
    }

    /// Verifies that the key index and recency list agree and that the
    /// capacity bound holds.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.entries.read().check_invariants()
    }
}

impl<K, V, E> Clone for LoadingCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<K, V, E> fmt::Debug for LoadingCache<K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("LoadingCache")
            .field("len", &entries.len())
            .field("capacity", &entries.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(capacity: usize) -> (LoadingCache<char, u32, String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = LoadingCache::new(capacity, move |key: &char| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(*key as u32)
        });
        (cache, calls)
    }

    fn lru_to_mru(cache: &LoadingCache<char, u32, String>) -> String {
        cache.keys().into_iter().rev().collect()
    }

    #[test]
    fn hit_reuses_loaded_value() {
        let (cache, calls) = counting_cache(4);
        let first = cache.get(&'a').unwrap();
        let second = cache.get(&'a').unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recency_order_after_mixed_touches() {
        let (cache, _) = counting_cache(4);
        for key in "ABCDAEACCCFG".chars() {
            cache.get(&key).unwrap();
        }
        assert_eq!(lru_to_mru(&cache), "ACFG");
        cache.check_invariants().unwrap();
    }

    #[test]
    fn peek_does_not_touch_or_load() {
        let (cache, calls) = counting_cache(2);
        assert!(cache.peek(&'a').is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        cache.get(&'a').unwrap();
        cache.get(&'b').unwrap();
        assert_eq!(cache.peek(&'a').as_deref(), Some(&('a' as u32)));

        cache.get(&'c').unwrap();
        assert!(!cache.contains(&'a'));
        assert_eq!(lru_to_mru(&cache), "bc");
    }

    #[test]
    fn invalidate_forces_reload() {
        let (cache, calls) = counting_cache(4);
        cache.get(&'x').unwrap();
        assert!(cache.invalidate(&'x'));
        assert!(!cache.invalidate(&'x'));

        cache.get(&'x').unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_capacity_shrinks_and_grows() {
        let (cache, _) = counting_cache(4);
        for key in "ABCD".chars() {
            cache.get(&key).unwrap();
        }
        cache.set_capacity(2);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(lru_to_mru(&cache), "CD");

        cache.set_capacity(3);
        cache.get(&'E').unwrap();
        assert_eq!(lru_to_mru(&cache), "CDE");
        cache.check_invariants().unwrap();
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let (cache, calls) = counting_cache(0);
        assert_eq!(cache.get(&'a').unwrap().as_ref(), &('a' as u32));
        assert!(cache.is_empty());

        cache.get(&'a').unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn failure_is_discarded_before_return() {
        let cache: LoadingCache<u8, u8, String> =
            LoadingCache::new(4, |key: &u8| Err(format!("no value for {key}")));

        assert_eq!(cache.get(&9).unwrap_err(), "no value for 9");
        assert!(!cache.contains(&9));
        assert!(cache.is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let (cache, calls) = counting_cache(4);
        let other = cache.clone();
        cache.get(&'q').unwrap();
        other.get(&'q').unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn debug_reports_len_and_capacity() {
        let (cache, _) = counting_cache(3);
        cache.get(&'a').unwrap();
        let rendered = format!("{cache:?}");
        assert!(rendered.contains("len: 1"));
        assert!(rendered.contains("capacity: 3"));
    }
}
