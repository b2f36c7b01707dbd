// this_file: src/entry.rs

//! Buffer-bearing entries and the hooks the cache attaches to them.
//!
//! The cache never polls an entry for its display state. Instead it attaches
//! exactly one [`DisplayHook`] per entry: a "became displayed" hook while the
//! entry is idle and a "became not displayed" hook while it is displayed. An
//! entry fires the hook matching each transition, passing its in-cache key.
//!
//! [`PooledImage`] is the stock implementation used by the binary and the
//! tests. Hooks are always invoked after the image's own lock is released, so
//! a hook may call straight back into the image.

use crate::buffer::{BufferInfo, PixelBuffer};
use crate::lock;
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Callback fired on a display transition, with the entry's in-cache key.
pub type DisplayHook = Arc<dyn Fn(&str) + Send + Sync>;

/// What the cache needs from the objects it stores.
///
/// `is_cached` and the cache key are written only by the cache. Attaching a
/// hook replaces any hook already attached for that transition; detaching
/// an absent hook is a no-op.
pub trait CacheEntry: Send + Sync + 'static {
    /// Shape of the held buffer, `None` once it has been released.
    fn buffer_info(&self) -> Option<BufferInfo>;

    fn is_valid_and_usable(&self) -> bool {
        self.buffer_info().is_some()
    }

    fn is_mutable(&self) -> bool;

    fn is_retained(&self) -> bool;
    fn set_retained(&self, retained: bool);

    fn is_cached(&self) -> bool;
    fn set_cached(&self, cached: bool);

    fn cache_key(&self) -> Option<String>;
    fn set_cache_key(&self, key: Option<String>);

    fn attach_displayed_hook(&self, hook: DisplayHook);
    fn detach_displayed_hook(&self);
    fn attach_not_displayed_hook(&self, hook: DisplayHook);
    fn detach_not_displayed_hook(&self);
}

#[derive(Default)]
struct ImageState {
    buffer: Option<PixelBuffer>,
    displayed: bool,
    retained: bool,
    cached: bool,
    cache_key: Option<String>,
    on_displayed: Option<DisplayHook>,
    on_not_displayed: Option<DisplayHook>,
}

impl ImageState {
    /// Drop the buffer once nobody can use it any more.
    fn release_if_unowned(&mut self) {
        if !self.cached && !self.displayed && !self.retained {
            if let Some(buffer) = self.buffer.take() {
                debug!("Releasing {} byte pixel buffer", buffer.capacity_bytes());
            }
        }
    }
}

/// A decoded image holding one pixel buffer.
///
/// The buffer is released as soon as the image is neither cached, displayed
/// nor retained.
#[derive(Default)]
pub struct PooledImage {
    state: Mutex<ImageState>,
}

impl PooledImage {
    pub fn new(buffer: PixelBuffer) -> Self {
        Self {
            state: Mutex::new(ImageState {
                buffer: Some(buffer),
                ..ImageState::default()
            }),
        }
    }

    /// Convenience for `Arc::new(PooledImage::new(buffer))`.
    pub fn shared(buffer: PixelBuffer) -> Arc<Self> {
        Arc::new(Self::new(buffer))
    }

    pub fn is_displayed(&self) -> bool {
        lock(&self.state).displayed
    }

    /// Record a display transition and fire the matching hook.
    pub fn set_displayed(&self, displayed: bool) {
        let (hook, key) = {
            let mut state = lock(&self.state);
            if state.displayed == displayed {
                return;
            }
            state.displayed = displayed;
            let hook = if displayed {
                state.on_displayed.clone()
            } else {
                state.release_if_unowned();
                state.on_not_displayed.clone()
            };
            (hook, state.cache_key.clone())
        };

        if let (Some(hook), Some(key)) = (hook, key) {
            hook(&key);
        }
    }

    /// Move the pixel buffer out, leaving the image invalid.
    ///
    /// This is how a claimant of a retained image takes over its allocation.
    pub fn take_buffer(&self) -> Option<PixelBuffer> {
        lock(&self.state).buffer.take()
    }

    /// Whether a hook is attached for each transition, as (displayed, not displayed).
    pub fn hooks_attached(&self) -> (bool, bool) {
        let state = lock(&self.state);
        (state.on_displayed.is_some(), state.on_not_displayed.is_some())
    }
}

impl CacheEntry for PooledImage {
    fn buffer_info(&self) -> Option<BufferInfo> {
        lock(&self.state).buffer.as_ref().map(PixelBuffer::info)
    }

    fn is_mutable(&self) -> bool {
        lock(&self.state)
            .buffer
            .as_ref()
            .map_or(false, PixelBuffer::is_mutable)
    }

    fn is_retained(&self) -> bool {
        lock(&self.state).retained
    }

    fn set_retained(&self, retained: bool) {
        let mut state = lock(&self.state);
        state.retained = retained;
        if !retained {
            state.release_if_unowned();
        }
    }

    fn is_cached(&self) -> bool {
        lock(&self.state).cached
    }

    fn set_cached(&self, cached: bool) {
        let mut state = lock(&self.state);
        state.cached = cached;
        if !cached {
            state.release_if_unowned();
        }
    }

    fn cache_key(&self) -> Option<String> {
        lock(&self.state).cache_key.clone()
    }

    fn set_cache_key(&self, key: Option<String>) {
        lock(&self.state).cache_key = key;
    }

    fn attach_displayed_hook(&self, hook: DisplayHook) {
        lock(&self.state).on_displayed = Some(hook);
    }

    fn detach_displayed_hook(&self) {
        lock(&self.state).on_displayed = None;
    }

    fn attach_not_displayed_hook(&self, hook: DisplayHook) {
        lock(&self.state).on_not_displayed = Some(hook);
    }

    fn detach_not_displayed_hook(&self) {
        lock(&self.state).on_not_displayed = None;
    }
}

impl fmt::Debug for PooledImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PooledImage")
            .field("buffer", &state.buffer.as_ref().map(PixelBuffer::info))
            .field("displayed", &state.displayed)
            .field("retained", &state.retained)
            .field("cached", &state.cached)
            .field("cache_key", &state.cache_key)
            .finish()
    }
}
