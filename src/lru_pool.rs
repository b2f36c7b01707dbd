// this_file: src/lru_pool.rs

//! Recency-ordered pool bounded by a byte budget.
//!
//! [`ByteLruPool`] knows nothing about what it stores beyond a byte size per
//! entry. Inserting past the high watermark evicts least-recently-used
//! entries until the pool is back under the low watermark. Everything that
//! leaves the pool is handed back to the caller as a [`Removed`] record so the
//! owner can tell policy-driven eviction from an intentional removal.

use lru::LruCache;

/// Why an entry left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Dropped by the byte-budget policy
    Evicted,
    /// Removed or replaced by the owner
    Explicit,
}

/// An entry that left the pool.
#[derive(Debug)]
pub struct Removed<V> {
    pub key: String,
    pub value: V,
    /// Size the entry was accounted at
    pub bytes: usize,
    pub cause: RemovalCause,
}

impl<V> Removed<V> {
    pub fn evicted(&self) -> bool {
        self.cause == RemovalCause::Evicted
    }
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    bytes: usize,
}

/// LRU map from key to value with high/low watermark eviction.
#[derive(Debug)]
pub struct ByteLruPool<V> {
    entries: LruCache<String, Slot<V>>,
    size_bytes: usize,
    high_watermark: usize,
    low_watermark: usize,
}

impl<V> ByteLruPool<V> {
    /// Create an empty pool. `low_watermark` is clamped to `high_watermark`.
    pub fn new(high_watermark: usize, low_watermark: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            size_bytes: 0,
            high_watermark,
            low_watermark: low_watermark.min(high_watermark),
        }
    }

    /// Insert `value` as the most recently used entry.
    ///
    /// A value already stored under `key` is replaced and reported as an
    /// explicit removal. If the pool then exceeds the high watermark, LRU
    /// entries are evicted until it is at or below the low watermark.
    pub fn add(&mut self, key: impl Into<String>, value: V, bytes: usize) -> Vec<Removed<V>> {
        let key = key.into();
        let mut removed = Vec::new();

        self.size_bytes += bytes;
        if let Some((old_key, old)) = self.entries.push(key, Slot { value, bytes }) {
            self.size_bytes -= old.bytes;
            removed.push(Removed {
                key: old_key,
                value: old.value,
                bytes: old.bytes,
                cause: RemovalCause::Explicit,
            });
        }

        if self.size_bytes > self.high_watermark {
            self.evict_to(self.low_watermark, &mut removed);
        }
        removed
    }

    fn evict_to(&mut self, target: usize, removed: &mut Vec<Removed<V>>) {
        while self.size_bytes > target {
            let Some((key, slot)) = self.entries.pop_lru() else {
                break;
            };
            self.size_bytes -= slot.bytes;
            removed.push(Removed {
                key,
                value: slot.value,
                bytes: slot.bytes,
                cause: RemovalCause::Evicted,
            });
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Look up `key` without touching its recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.peek(key).map(|slot| &slot.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Remove `key` on behalf of the owner.
    pub fn remove(&mut self, key: &str) -> Option<Removed<V>> {
        let (key, slot) = self.entries.pop_entry(key)?;
        self.size_bytes -= slot.bytes;
        Some(Removed {
            key,
            value: slot.value,
            bytes: slot.bytes,
            cause: RemovalCause::Explicit,
        })
    }

    /// Remove every entry, least recently used first.
    pub fn drain(&mut self) -> Vec<Removed<V>> {
        let mut removed = Vec::with_capacity(self.entries.len());
        while let Some((key, slot)) = self.entries.pop_lru() {
            removed.push(Removed {
                key,
                value: slot.value,
                bytes: slot.bytes,
                cause: RemovalCause::Explicit,
            });
        }
        self.size_bytes = 0;
        removed
    }

    /// Entries from least to most recently used.
    pub fn iter_lru(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries
            .iter()
            .rev()
            .map(|(key, slot)| (key.as_str(), &slot.value))
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.iter_lru().map(|(key, _)| key.to_string()).collect()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn high_watermark(&self) -> usize {
        self.high_watermark
    }

    pub fn low_watermark(&self) -> usize {
        self.low_watermark
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lru_first_and_get_refreshes() {
        let mut pool = ByteLruPool::new(1000, 500);
        pool.add("a", 1, 10);
        pool.add("b", 2, 10);
        pool.add("c", 3, 10);
        assert_eq!(pool.keys(), vec!["a", "b", "c"]);

        assert_eq!(pool.get("a"), Some(&1));
        assert_eq!(pool.keys(), vec!["b", "c", "a"]);

        assert_eq!(pool.peek("b"), Some(&2));
        assert_eq!(pool.keys(), vec!["b", "c", "a"]);
    }

    #[test]
    fn eviction_drains_to_low_watermark() {
        let mut pool = ByteLruPool::new(100, 50);
        for i in 0..5 {
            assert!(pool.add(format!("k{}", i), i, 20).is_empty());
        }
        assert_eq!(pool.size_bytes(), 100);

        let removed = pool.add("k5", 5, 20);
        assert_eq!(pool.size_bytes(), 40);
        assert_eq!(removed.len(), 4);
        assert!(removed.iter().all(Removed::evicted));
        let keys: Vec<_> = removed.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3"]);
        assert_eq!(pool.keys(), vec!["k4", "k5"]);
    }

    #[test]
    fn oversized_entry_is_evicted_immediately() {
        let mut pool = ByteLruPool::new(100, 50);
        let removed = pool.add("huge", (), 500);
        assert_eq!(removed.len(), 1);
        assert!(removed[0].evicted());
        assert!(pool.is_empty());
        assert_eq!(pool.size_bytes(), 0);
    }

    #[test]
    fn explicit_remove_is_not_an_eviction() {
        let mut pool = ByteLruPool::new(100, 50);
        pool.add("a", 'a', 30);
        let removed = pool.remove("a").expect("present");
        assert!(!removed.evicted());
        assert_eq!(removed.bytes, 30);
        assert_eq!(pool.size_bytes(), 0);
        assert!(pool.remove("a").is_none());
    }

    #[test]
    fn replacing_a_key_reports_old_value() {
        let mut pool = ByteLruPool::new(100, 50);
        pool.add("a", 1, 30);
        let removed = pool.add("a", 2, 10);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].value, 1);
        assert_eq!(removed[0].cause, RemovalCause::Explicit);
        assert_eq!(pool.size_bytes(), 10);
        assert_eq!(pool.peek("a"), Some(&2));
    }

    #[test]
    fn drain_empties_the_pool() {
        let mut pool = ByteLruPool::new(100, 50);
        pool.add("a", 1, 10);
        pool.add("b", 2, 10);
        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
        assert_eq!(pool.size_bytes(), 0);
    }

    #[test]
    fn zero_budget_keeps_nothing() {
        let mut pool = ByteLruPool::new(0, 0);
        let removed = pool.add("a", 1, 1);
        assert_eq!(removed.len(), 1);
        assert!(pool.is_empty());
    }
}
