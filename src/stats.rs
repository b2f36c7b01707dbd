// this_file: src/stats.rs

//! Cache statistics and the periodic stats dump.

use crate::cache::ReuseCache;
use crate::entry::CacheEntry;
use crate::error::Result;
use log::{debug, info, warn};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Snapshot of cache sizes and counters, taken under the cache lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the displayed tier
    pub displayed_count: usize,
    /// Entries in the idle tier
    pub idle_count: usize,
    /// Bytes owned across both tiers
    pub current_bytes: usize,
    /// Bytes in the idle tier
    pub idle_bytes: usize,
    pub high_watermark_bytes: usize,
    pub low_watermark_bytes: usize,
    /// Entries accepted by `add`
    pub added: u64,
    /// Entries that left through removal or eviction
    pub removed: u64,
    /// Entries dropped by the byte budget
    pub evictions: u64,
    pub hits: u64,
    pub misses: u64,
    pub reuse_hits: u64,
    pub reuse_misses: u64,
}

impl CacheStats {
    pub fn entry_count(&self) -> usize {
        self.displayed_count + self.idle_count
    }

    /// Lookup hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.misses)
    }

    /// Reuse hit rate (0.0 to 1.0)
    pub fn reuse_rate(&self) -> f64 {
        ratio(self.reuse_hits, self.reuse_misses)
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entries={} (displayed={}, idle={}) bytes={} idle_bytes={}/{} \
             added={} removed={} evictions={} hits={} misses={} \
             reuse_hits={} reuse_misses={} hit_rate={:.1}% reuse_rate={:.1}%",
            self.entry_count(),
            self.displayed_count,
            self.idle_count,
            self.current_bytes,
            self.idle_bytes,
            self.high_watermark_bytes,
            self.added,
            self.removed,
            self.evictions,
            self.hits,
            self.misses,
            self.reuse_hits,
            self.reuse_misses,
            self.hit_rate() * 100.0,
            self.reuse_rate() * 100.0,
        )
    }
}

/// Background thread logging a cache's stats at a fixed interval.
///
/// Stops when [`StatsReporter::stop`] is called or the reporter is dropped.
pub struct StatsReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsReporter {
    pub fn spawn<E: CacheEntry>(cache: ReuseCache<E>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("pixpool-stats".into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => info!("Reuse cache: {}", cache.stats()),
                    _ => break,
                }
            })?;
        debug!("Stats reporter started ({:?} interval)", interval);
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and ends the loop.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Stats reporter thread panicked");
            }
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
