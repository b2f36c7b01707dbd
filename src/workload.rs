// this_file: src/workload.rs

//! Synthetic decode/display workload.
//!
//! Each frame asks the cache for a reusable buffer, falls back to a fresh
//! allocation on a miss, "decodes" into it, caches the image and cycles it
//! through the displayed tier. Frames run in parallel on a dedicated rayon
//! pool so the cache sees real contention.

use crate::buffer::PixelBuffer;
use crate::cache::ReuseCache;
use crate::entry::{CacheEntry, PooledImage};
use crate::error::{Error, Result};
use crate::layout::PixelLayout;
use crate::matcher::ReuseRequest;
use crate::stats::CacheStats;
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Frame sizes cycled through by the workload.
const FRAME_SIZES: [(u32, u32); 5] = [(256, 256), (256, 192), (192, 256), (128, 128), (320, 240)];

/// Shape of a workload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadParams {
    pub frames: usize,
    pub workers: usize,
    pub layout: PixelLayout,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            frames: 1000,
            workers: 4,
            layout: PixelLayout::Argb8888,
        }
    }
}

/// Outcome of a workload run.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadReport {
    pub frames: usize,
    /// Frames that needed a fresh allocation
    pub allocated: usize,
    /// Frames served from a reused buffer
    pub reused: usize,
    pub stats: CacheStats,
}

/// Run `params.frames` frames against `cache`.
pub fn run(cache: &ReuseCache<PooledImage>, params: &WorkloadParams) -> Result<WorkloadReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.workers.max(1))
        .thread_name(|i| format!("pixpool-decode-{}", i))
        .build()
        .map_err(|e| Error::Config(format!("cannot start decode workers: {}", e)))?;

    let allocated = AtomicUsize::new(0);
    let reused = AtomicUsize::new(0);

    pool.install(|| {
        (0..params.frames).into_par_iter().try_for_each(|frame| {
            let (width, height) = FRAME_SIZES[frame % FRAME_SIZES.len()];
            let request = ReuseRequest::new(width, height, 1, params.layout);

            let mut buffer = match cache
                .claim_for_reuse(&request)
                .and_then(|entry| repurpose(&entry, &request))
            {
                Some(buffer) => {
                    reused.fetch_add(1, Ordering::Relaxed);
                    buffer
                }
                None => {
                    allocated.fetch_add(1, Ordering::Relaxed);
                    PixelBuffer::new(width, height, params.layout)?
                }
            };
            buffer.pixels_mut()?.fill(frame as u8);

            let image = PooledImage::shared(buffer);
            cache.add(format!("frame-{}", frame), Arc::clone(&image));
            image.set_displayed(true);
            image.set_displayed(false);
            Ok::<(), Error>(())
        })
    })?;

    let report = WorkloadReport {
        frames: params.frames,
        allocated: allocated.into_inner(),
        reused: reused.into_inner(),
        stats: cache.stats(),
    };
    debug!(
        "Workload finished: {} frames, {} allocated, {} reused",
        report.frames, report.allocated, report.reused
    );
    Ok(report)
}

/// Take the buffer out of a claimed image and reshape it to the decoded size of `request`.
///
/// Retention is released either way; a buffer that cannot be reshaped is
/// dropped.
fn repurpose(entry: &PooledImage, request: &ReuseRequest) -> Option<PixelBuffer> {
    let buffer = entry.take_buffer();
    entry.set_retained(false);
    let mut buffer = buffer?;
    let (width, height) = request.decoded_size();
    buffer.reconfigure(width, height, request.layout).ok()?;
    Some(buffer)
}
