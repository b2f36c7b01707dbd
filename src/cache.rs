// this_file: src/cache.rs

//! Dual-tier reuse cache for buffer-bearing entries.
//!
//! Entries live in exactly one of two tiers:
//!
//! - the **displayed** tier, a plain map of entries a consumer is showing.
//!   Nothing here is ever evicted or handed out for reuse;
//! - the **idle** tier, a [`ByteLruPool`] bounded by the high/low watermarks.
//!   Idle entries age out under byte pressure and are the candidates for
//!   [`ReuseCache::claim_for_reuse`].
//!
//! Entries move between the tiers through display hooks the cache attaches to
//! them (see [`crate::entry`]). All state, counters included, sits behind one
//! mutex that every public operation holds for its full duration. Hooks run
//! on the consumer's thread and take the same lock, so an entry must never
//! change its display state from inside a cache call.

use crate::config::PoolConfig;
use crate::entry::{CacheEntry, DisplayHook};
use crate::error::{Error, Result};
use crate::lock;
use crate::lru_pool::{ByteLruPool, RemovalCause, Removed};
use crate::matcher::{can_reuse, ReusePolicy, ReuseRequest};
use crate::stats::CacheStats;
use crate::PooledImage;
use log::{debug, error};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    added: u64,
    removed: u64,
    evictions: u64,
    hits: u64,
    misses: u64,
    reuse_hits: u64,
    reuse_misses: u64,
}

/// A displayed entry and the size it was accounted at.
struct Held<E> {
    entry: Arc<E>,
    bytes: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Transition {
    Displayed,
    NotDisplayed,
}

struct CacheState<E: CacheEntry> {
    displayed: HashMap<String, Held<E>>,
    idle: ByteLruPool<Arc<E>>,
    current_bytes: usize,
    refill_needed: bool,
    policy: ReusePolicy,
    verbose: bool,
    counters: Counters,
    this: Weak<Mutex<CacheState<E>>>,
}

impl<E: CacheEntry> CacheState<E> {
    /// Build the hook an entry fires on `transition`.
    ///
    /// The hook holds the entry weakly and only acts if the tier still maps
    /// the key to that same entry, so a late hook cannot move a newer entry
    /// stored under a reused key.
    fn hook(&self, entry: &Arc<E>, transition: Transition) -> DisplayHook {
        let cache = self.this.clone();
        let target = Arc::downgrade(entry);
        Arc::new(move |key: &str| {
            let (Some(cache), Some(entry)) = (cache.upgrade(), target.upgrade()) else {
                return;
            };
            let mut state = lock(&cache);
            match transition {
                Transition::Displayed => state.promote(key, &entry),
                Transition::NotDisplayed => state.demote(key, &entry),
            }
        })
    }

    fn contains(&self, key: &str) -> bool {
        self.displayed.contains_key(key) || self.idle.contains(key)
    }

    fn insert(&mut self, key: String, entry: Arc<E>, bytes: usize) {
        entry.set_cache_key(Some(key.clone()));
        entry.set_cached(true);
        entry.attach_displayed_hook(self.hook(&entry, Transition::Displayed));
        self.current_bytes += bytes;
        self.counters.added += 1;
        if self.verbose {
            debug!(
                "Added {} ({} bytes), cache now {} bytes",
                key, bytes, self.current_bytes
            );
        }
        self.push_idle(key, entry, bytes);
    }

    fn push_idle(&mut self, key: String, entry: Arc<E>, bytes: usize) {
        for removed in self.idle.add(key, entry, bytes) {
            let evicted = removed.evicted();
            self.teardown(removed, evicted);
        }
    }

    /// Undo the bookkeeping of an entry leaving the cache for good.
    fn teardown(&mut self, removed: Removed<Arc<E>>, evicted: bool) {
        let Removed {
            key, value, bytes, ..
        } = removed;
        self.current_bytes = self.current_bytes.saturating_sub(bytes);
        Self::detach(&value);
        value.set_cached(false);
        value.set_cache_key(None);
        self.counters.removed += 1;
        if evicted {
            self.counters.evictions += 1;
        }
        if self.verbose {
            debug!(
                "{} {} ({} bytes), cache now {} bytes",
                if evicted { "Evicted" } else { "Removed" },
                key,
                bytes,
                self.current_bytes
            );
        }
    }

    fn detach(entry: &Arc<E>) {
        entry.detach_displayed_hook();
        entry.detach_not_displayed_hook();
    }

    fn promote(&mut self, key: &str, entry: &Arc<E>) {
        let same = self
            .idle
            .peek(key)
            .map_or(false, |held| Arc::ptr_eq(held, entry));
        if !same {
            return;
        }
        let Some(removed) = self.idle.remove(key) else {
            return;
        };
        entry.detach_displayed_hook();
        entry.attach_not_displayed_hook(self.hook(entry, Transition::NotDisplayed));
        if self.verbose {
            debug!("Promoted {} to displayed", key);
        }
        self.displayed.insert(
            removed.key,
            Held {
                entry: removed.value,
                bytes: removed.bytes,
            },
        );
    }

    fn demote(&mut self, key: &str, entry: &Arc<E>) {
        let same = self
            .displayed
            .get(key)
            .map_or(false, |held| Arc::ptr_eq(&held.entry, entry));
        if !same {
            return;
        }
        let Some((key, held)) = self.displayed.remove_entry(key) else {
            return;
        };
        entry.detach_not_displayed_hook();
        entry.attach_displayed_hook(self.hook(entry, Transition::Displayed));
        if self.verbose {
            debug!("Demoted {} to idle", key);
        }
        self.push_idle(key, held.entry, held.bytes);
    }

    fn reusable(&self, entry: &E, request: &ReuseRequest) -> bool {
        entry.is_valid_and_usable()
            && entry.is_mutable()
            && !entry.is_retained()
            && entry
                .buffer_info()
                .map_or(false, |info| can_reuse(&info, request, self.policy))
    }

    fn claim(&mut self, request: &ReuseRequest) -> Option<Arc<E>> {
        if self.idle.size_bytes() < self.idle.low_watermark() && self.refill_needed {
            self.counters.reuse_misses += 1;
            return None;
        }
        self.refill_needed = false;

        let found = self
            .idle
            .iter_lru()
            .find(|(_, entry)| self.reusable(entry, request))
            .map(|(key, _)| key.to_string());

        let Some(removed) = found.and_then(|key| self.idle.remove(&key)) else {
            self.counters.reuse_misses += 1;
            self.refill_needed = true;
            if self.verbose {
                debug!("No reusable buffer for {:?}", request);
            }
            return None;
        };

        let entry = removed.value;
        entry.set_retained(true);
        self.current_bytes = self.current_bytes.saturating_sub(removed.bytes);
        Self::detach(&entry);
        entry.set_cached(false);
        entry.set_cache_key(None);
        self.counters.reuse_hits += 1;
        if self.verbose {
            debug!(
                "Reusing {} ({} bytes) for {:?}",
                removed.key, removed.bytes, request
            );
        }
        Some(entry)
    }

    fn clear(&mut self) {
        let displayed: Vec<_> = self.displayed.drain().collect();
        for (key, held) in displayed {
            self.teardown(
                Removed {
                    key,
                    value: held.entry,
                    bytes: held.bytes,
                    cause: RemovalCause::Explicit,
                },
                false,
            );
        }
        for removed in self.idle.drain() {
            self.teardown(removed, false);
        }
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            displayed_count: self.displayed.len(),
            idle_count: self.idle.len(),
            current_bytes: self.current_bytes,
            idle_bytes: self.idle.size_bytes(),
            high_watermark_bytes: self.idle.high_watermark(),
            low_watermark_bytes: self.idle.low_watermark(),
            added: self.counters.added,
            removed: self.counters.removed,
            evictions: self.counters.evictions,
            hits: self.counters.hits,
            misses: self.counters.misses,
            reuse_hits: self.counters.reuse_hits,
            reuse_misses: self.counters.reuse_misses,
        }
    }
}

/// Shared handle to a dual-tier reuse cache.
///
/// Cloning is cheap; every clone talks to the same tiers.
///
/// # Example
///
/// ```
/// use pixpool::{PixelBuffer, PixelLayout, PoolConfig, PooledImage, ReuseCache, ReuseRequest};
///
/// let cache: ReuseCache = ReuseCache::new(PoolConfig::with_watermarks(32 * 1024, 16 * 1024));
/// let image = PooledImage::shared(PixelBuffer::new(64, 64, PixelLayout::Argb8888).unwrap());
/// assert!(cache.add("tile-1", image.clone()));
///
/// image.set_displayed(true);
/// assert_eq!(cache.displayed_count(), 1);
/// image.set_displayed(false);
///
/// let request = ReuseRequest::new(64, 64, 1, PixelLayout::Argb8888);
/// let reused = cache.claim_for_reuse(&request).expect("idle tier is full enough");
/// assert!(std::sync::Arc::ptr_eq(&reused, &image));
/// ```
pub struct ReuseCache<E: CacheEntry = PooledImage> {
    state: Arc<Mutex<CacheState<E>>>,
}

impl<E: CacheEntry> Clone for ReuseCache<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: CacheEntry> ReuseCache<E> {
    /// Create a cache from `config` without validating it.
    ///
    /// A nonsensical configuration (zero watermarks, low above high) does not
    /// fail; the cache simply keeps nothing idle and misses every reuse.
    pub fn new(config: PoolConfig) -> Self {
        let state = Arc::new_cyclic(|this| {
            Mutex::new(CacheState {
                displayed: HashMap::new(),
                idle: ByteLruPool::new(config.high_watermark_bytes, config.low_watermark_bytes),
                current_bytes: 0,
                refill_needed: true,
                policy: config.reuse_policy,
                verbose: config.verbose_logging,
                counters: Counters::default(),
                this: this.clone(),
            })
        });
        Self { state }
    }

    /// Create a cache after validating `config`.
    pub fn try_new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Insert `entry` into the idle tier under `key`.
    ///
    /// Returns `false` without touching the cache when the key is empty, the
    /// entry has no usable buffer, the key is already cached, or the entry
    /// itself is already cached or retained.
    pub fn add(&self, key: impl Into<String>, entry: Arc<E>) -> bool {
        let key = key.into();
        if key.is_empty() {
            error!("Refusing to cache an entry under an empty key");
            return false;
        }
        let Some(info) = entry.buffer_info() else {
            error!("Refusing to cache {}: buffer is released", key);
            return false;
        };
        if !entry.is_valid_and_usable() {
            error!("Refusing to cache {}: buffer is not usable", key);
            return false;
        }

        let mut state = lock(&self.state);
        if state.contains(&key) {
            if state.verbose {
                debug!("{} is already cached", key);
            }
            return false;
        }
        if entry.is_cached() || entry.is_retained() {
            error!(
                "Refusing to cache {}: entry is already cached or retained",
                key
            );
            return false;
        }
        state.insert(key, entry, info.byte_count());
        true
    }

    /// Look up `key`, refreshing its recency if it is idle.
    pub fn try_get(&self, key: &str) -> Option<Arc<E>> {
        let mut state = lock(&self.state);
        let displayed = state.displayed.get(key).map(|held| Arc::clone(&held.entry));
        let found = displayed.or_else(|| state.idle.get(key).cloned());
        if found.is_some() {
            state.counters.hits += 1;
        } else {
            state.counters.misses += 1;
        }
        found
    }

    /// Look up `key` without refreshing recency or counting a hit.
    pub fn peek(&self, key: &str) -> Option<Arc<E>> {
        let state = lock(&self.state);
        state
            .displayed
            .get(key)
            .map(|held| Arc::clone(&held.entry))
            .or_else(|| state.idle.peek(key).cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.state).contains(key)
    }

    /// Remove `key` from whichever tier holds it.
    ///
    /// Counts as a removal but not as an eviction.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = lock(&self.state);
        let removed = match state.displayed.remove_entry(key) {
            Some((key, held)) => Some(Removed {
                key,
                value: held.entry,
                bytes: held.bytes,
                cause: RemovalCause::Explicit,
            }),
            None => state.idle.remove(key),
        };
        match removed {
            Some(removed) => {
                state.teardown(removed, false);
                true
            }
            None => false,
        }
    }

    /// Hand out an idle entry whose buffer can serve `request`.
    ///
    /// Idle entries are scanned least recently used first and the first
    /// compatible one wins. The returned entry has left the cache and is
    /// marked retained; the caller must clear `retained` once it has
    /// repurposed or discarded the buffer.
    ///
    /// While the idle tier is below the low watermark after a failed search,
    /// every claim misses without scanning until the tier fills back up.
    pub fn claim_for_reuse(&self, request: &ReuseRequest) -> Option<Arc<E>> {
        lock(&self.state).claim(request)
    }

    /// Keys across both tiers: displayed first, then idle from least recently used.
    pub fn keys(&self) -> Vec<String> {
        let state = lock(&self.state);
        let mut seen = HashSet::new();
        state
            .displayed
            .keys()
            .cloned()
            .chain(state.idle.keys())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    /// Idle keys from least to most recently used.
    pub fn idle_keys(&self) -> Vec<String> {
        lock(&self.state).idle.keys()
    }

    /// Entries across both tiers, in the order of [`ReuseCache::keys`].
    pub fn values(&self) -> Vec<Arc<E>> {
        let state = lock(&self.state);
        let mut seen = HashSet::new();
        state
            .displayed
            .iter()
            .map(|(key, held)| (key.as_str(), &held.entry))
            .chain(state.idle.iter_lru())
            .filter(|(key, _)| seen.insert(key.to_string()))
            .map(|(_, entry)| Arc::clone(entry))
            .collect()
    }

    /// Bulk copy-out is not supported; use [`ReuseCache::values`].
    pub fn copy_to(&self, _target: &mut [Arc<E>]) -> Result<()> {
        Err(Error::Unsupported(
            "copying cached entries into a slice".into(),
        ))
    }

    /// Number of entries across both tiers.
    pub fn len(&self) -> usize {
        let state = lock(&self.state);
        state.displayed.len() + state.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn displayed_count(&self) -> usize {
        lock(&self.state).displayed.len()
    }

    pub fn idle_count(&self) -> usize {
        lock(&self.state).idle.len()
    }

    /// Bytes owned by the cache across both tiers.
    pub fn current_bytes(&self) -> usize {
        lock(&self.state).current_bytes
    }

    pub fn idle_bytes(&self) -> usize {
        lock(&self.state).idle.size_bytes()
    }

    /// Whether the last reuse search came up empty and the idle tier has not
    /// been seen at the low watermark since.
    pub fn refill_needed(&self) -> bool {
        lock(&self.state).refill_needed
    }

    pub fn policy(&self) -> ReusePolicy {
        lock(&self.state).policy
    }

    /// Remove every entry from both tiers.
    pub fn clear(&self) {
        lock(&self.state).clear();
    }

    /// Consistent snapshot of sizes and counters.
    pub fn stats(&self) -> CacheStats {
        lock(&self.state).stats()
    }
}
