// this_file: src/matcher.rs

//! Reuse compatibility between an idle buffer and an allocation request.

use crate::buffer::BufferInfo;
use crate::layout::PixelLayout;
use serde::{Deserialize, Serialize};

/// How an idle buffer is judged compatible with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReusePolicy {
    /// Any buffer whose allocation is large enough (platforms that can
    /// reshape an allocation).
    #[default]
    Capacity,
    /// Only a buffer with identical dimensions, and only for unscaled
    /// decodes (platforms that cannot reshape).
    Exact,
}

/// What an allocation requester wants a buffer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseRequest {
    pub width: u32,
    pub height: u32,
    /// Downsampling factor of the decode; always at least 1
    pub sample_factor: u32,
    pub layout: PixelLayout,
}

impl ReuseRequest {
    /// A request for a `width x height` decode scaled down by `sample_factor`.
    ///
    /// A sample factor of 0 is treated as 1.
    pub fn new(width: u32, height: u32, sample_factor: u32, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            sample_factor: sample_factor.max(1),
            layout,
        }
    }

    /// Effective sample factor; a hand-built request with 0 counts as 1.
    pub fn sample(&self) -> u32 {
        self.sample_factor.max(1)
    }

    /// Dimensions of the decoded bitmap, `floor(width / sample) x floor(height / sample)`.
    pub fn decoded_size(&self) -> (u32, u32) {
        let sample = self.sample();
        (self.width / sample, self.height / sample)
    }

    /// Bytes a buffer must provide for this request.
    pub fn required_bytes(&self) -> usize {
        let (w, h) = self.decoded_size();
        (w as usize)
            .saturating_mul(h as usize)
            .saturating_mul(self.layout.bytes_per_pixel())
    }
}

/// Decide whether `candidate` can back `request` under `policy`.
pub fn can_reuse(candidate: &BufferInfo, request: &ReuseRequest, policy: ReusePolicy) -> bool {
    match policy {
        ReusePolicy::Capacity => request.required_bytes() <= candidate.capacity_bytes,
        ReusePolicy::Exact => {
            candidate.width == request.width
                && candidate.height == request.height
                && request.sample() == 1
        }
    }
}
