// this_file: src/lib.rs
//! Pixpool - reuse cache for decoded pixel buffers
//!
//! This library provides:
//! - A byte-bounded LRU pool with high/low watermark eviction
//! - A displayed/idle dual-tier cache that keeps in-use buffers safe
//! - First-fit reuse of idle buffers for new decodes
//! - Statistics and a periodic stats dump

pub mod buffer;
pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod layout;
pub mod logging;
pub mod lru_pool;
pub mod matcher;
pub mod stats;
pub mod workload;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use buffer::{BufferInfo, PixelBuffer};
pub use cache::ReuseCache;
pub use config::PoolConfig;
pub use entry::{CacheEntry, DisplayHook, PooledImage};
pub use error::{Error, Result};
pub use layout::PixelLayout;
pub use lru_pool::{ByteLruPool, RemovalCause, Removed};
pub use matcher::{can_reuse, ReusePolicy, ReuseRequest};
pub use stats::{CacheStats, StatsReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lock a mutex, carrying on with the inner state if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
