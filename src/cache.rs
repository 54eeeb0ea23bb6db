//! Bounded LRU cache for registry metadata documents and tarball bytes.
//!
//! The classic doubly-linked-list-via-mutable-references LRU design doesn't
//! translate cleanly into safe Rust, so entries live in a flat arena (`Vec<
//! Option<Slot<K, V>>>`) and are threaded into an MRU-ordered list using
//! `prev`/`next` indices into that same arena — a small integer handle per
//! entry instead of a pointer. Lookups go through a `HashMap<K, usize>` from
//! key to slot index.

use std::collections::HashMap;
use std::hash::Hash;

const NONE: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Cumulative hit/miss/eviction counters for a [`Cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or `0.0` when the cache has never been read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A callback invoked with `(key, value)` whenever an entry is evicted to
/// make room for a new one, so callers can release associated resources
/// (e.g. freeing a decoded tarball buffer).
pub type EvictionHook<K, V> = Box<dyn FnMut(&K, &V) + Send>;

/// Fixed-capacity, most-recently-used-ordered cache.
///
/// All operations (`get`, `set`, `delete`, `peek`, `has`) run in O(1)
/// amortized time: the index map gives O(1) slot lookup, and relinking a
/// slot into the MRU list touches only its immediate neighbors.
pub struct Cache<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize, // most recently used
    tail: usize, // least recently used
    stats: CacheStats,
    on_evict: Option<EvictionHook<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Cache {
            capacity,
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NONE,
            tail: NONE,
            stats: CacheStats::default(),
            on_evict: None,
        }
    }

    pub fn with_eviction_hook(capacity: usize, hook: EvictionHook<K, V>) -> Self {
        let mut cache = Self::new(capacity);
        cache.on_evict = Some(hook);
        cache
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn slot(&self, idx: usize) -> &Slot<K, V> {
        self.slots[idx].as_ref().expect("slot index must be live")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<K, V> {
        self.slots[idx].as_mut().expect("slot index must be live")
    }

    /// Returns a reference to the value for `key`, promoting it to
    /// most-recently-used. Records a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.touch(idx);
                self.stats.hits += 1;
                Some(&self.slot(idx).value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up a value without affecting recency or hit/miss statistics.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.slot(idx).value)
    }

    pub fn has(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or updates `key`, promoting it to most-recently-used. If the
    /// cache is at capacity and `key` is new, evicts the least-recently-used
    /// entry first.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.slot_mut(idx).value = value;
            self.touch(idx);
            return;
        }

        if self.index.len() >= self.capacity {
            self.evict_lru();
        }

        let idx = self.alloc_slot(key.clone(), value);
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    /// Removes `key` if present, returning its value. Does not affect hit
    /// statistics.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("slot index must be live");
        self.free.push(idx);
        Some(slot.value)
    }

    /// Drops every entry, invoking the eviction hook for each one (in
    /// MRU-to-LRU order) before resetting the MRU list. Preserves cumulative
    /// stats (callers that want a clean slate should construct a new
    /// `Cache`).
    pub fn clear(&mut self) {
        if let Some(mut hook) = self.on_evict.take() {
            let mut cur = self.head;
            while cur != NONE {
                let slot = self.slot(cur);
                hook(&slot.key, &slot.value);
                cur = slot.next;
            }
            self.on_evict = Some(hook);
        }
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NONE;
        self.tail = NONE;
    }

    /// Keys in MRU-to-LRU order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut out = Vec::with_capacity(self.index.len());
        let mut cur = self.head;
        while cur != NONE {
            let slot = self.slot(cur);
            out.push(slot.key.clone());
            cur = slot.next;
        }
        out
    }

    /// Shrinks or grows the capacity, evicting from the LRU end until the
    /// new capacity is satisfied. Growing never evicts.
    pub fn resize(&mut self, new_capacity: usize) {
        assert!(new_capacity > 0, "cache capacity must be positive");
        self.capacity = new_capacity;
        while self.index.len() > self.capacity {
            self.evict_lru();
        }
    }

    fn alloc_slot(&mut self, key: K, value: V) -> usize {
        let slot = Some(Slot {
            key,
            value,
            prev: NONE,
            next: NONE,
        });
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = slot;
            idx
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        if prev != NONE {
            self.slot_mut(prev).next = next;
        } else if self.head == idx {
            self.head = next;
        }
        if next != NONE {
            self.slot_mut(next).prev = prev;
        } else if self.tail == idx {
            self.tail = prev;
        }
        let slot = self.slot_mut(idx);
        slot.prev = NONE;
        slot.next = NONE;
    }

    fn push_front(&mut self, idx: usize) {
        self.slot_mut(idx).prev = NONE;
        self.slot_mut(idx).next = self.head;
        if self.head != NONE {
            self.slot_mut(self.head).prev = idx;
        }
        self.head = idx;
        if self.tail == NONE {
            self.tail = idx;
        }
    }

    fn evict_lru(&mut self) {
        if self.tail == NONE {
            return;
        }
        let idx = self.tail;
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("slot index must be live");
        self.index.remove(&slot.key);
        if let Some(hook) = self.on_evict.as_mut() {
            hook(&slot.key, &slot.value);
        }
        self.free.push(idx);
        self.stats.evictions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let mut c = Cache::new(2);
        c.set("a", 1);
        assert_eq!(c.get(&"a"), Some(&1));
        assert_eq!(c.stats().hits, 1);
        assert_eq!(c.get(&"missing"), None);
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let mut c = Cache::new(2);
        c.set("a", 1);
        c.set("b", 2);
        c.get(&"a"); // promote a, b is now LRU
        c.set("c", 3); // evicts b
        assert!(c.has(&"a"));
        assert!(!c.has(&"b"));
        assert!(c.has(&"c"));
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn set_on_existing_key_updates_without_evicting() {
        let mut c = Cache::new(1);
        c.set("a", 1);
        c.set("a", 2);
        assert_eq!(c.peek(&"a"), Some(&2));
        assert_eq!(c.stats().evictions, 0);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn peek_does_not_affect_recency_or_stats() {
        let mut c = Cache::new(2);
        c.set("a", 1);
        c.set("b", 2);
        c.peek(&"a");
        c.set("c", 3); // a was not promoted by peek, so it's still LRU-adjacent to b
        assert_eq!(c.stats().hits, 0);
        assert_eq!(c.stats().misses, 0);
        assert!(!c.has(&"a"));
    }

    #[test]
    fn keys_are_mru_to_lru_ordered() {
        let mut c = Cache::new(3);
        c.set("a", 1);
        c.set("b", 2);
        c.set("c", 3);
        c.get(&"a");
        assert_eq!(c.keys(), vec!["a", "c", "b"]);
    }

    #[test]
    fn delete_removes_entry_and_reclaims_slot() {
        let mut c = Cache::new(2);
        c.set("a", 1);
        c.set("b", 2);
        assert_eq!(c.delete(&"a"), Some(1));
        assert!(!c.has(&"a"));
        assert_eq!(c.len(), 1);
        c.set("c", 3);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn resize_down_evicts_from_lru_end() {
        let mut c = Cache::new(3);
        c.set("a", 1);
        c.set("b", 2);
        c.set("c", 3);
        c.resize(1);
        assert_eq!(c.len(), 1);
        assert!(c.has(&"c"));
        assert!(c.stats().evictions >= 2);
    }

    #[test]
    fn eviction_hook_is_invoked_with_evicted_pair() {
        use std::sync::{Arc, Mutex};
        let log: Arc<Mutex<Vec<(&'static str, i32)>>> = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let mut c: Cache<&'static str, i32> = Cache::with_eviction_hook(
            1,
            Box::new(move |k, v| log2.lock().unwrap().push((*k, *v))),
        );
        c.set("a", 1);
        c.set("b", 2);
        assert_eq!(*log.lock().unwrap(), vec![("a", 1)]);
    }

    #[test]
    fn clear_invokes_eviction_hook_for_every_remaining_entry() {
        use std::sync::{Arc, Mutex};
        let log: Arc<Mutex<Vec<(&'static str, i32)>>> = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let mut c: Cache<&'static str, i32> = Cache::with_eviction_hook(
            2,
            Box::new(move |k, v| log2.lock().unwrap().push((*k, *v))),
        );
        c.set("a", 1);
        c.set("b", 2);
        c.clear();
        let seen = log.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&("a", 1)));
        assert!(seen.contains(&("b", 2)));
        assert_eq!(c.len(), 0);
        // the hook survives clear() and fires again on a later eviction
        c.set("c", 3);
        c.set("d", 4);
        c.set("e", 5);
        assert_eq!(log.lock().unwrap().len(), 3);
    }
}
