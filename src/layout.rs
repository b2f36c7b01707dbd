// this_file: src/layout.rs

//! Pixel layout classes and their storage cost.

use serde::{Deserialize, Serialize};

/// Per-pixel memory encoding of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    /// 8 bits per channel, with alpha
    Argb8888,
    /// 5/6/5 bits, no alpha
    Rgb565,
    /// 4 bits per channel, with alpha
    Argb4444,
    /// Single alpha channel
    Alpha8,
    /// Layout this crate does not know about; costed at one byte per pixel
    Other(u32),
}

impl PixelLayout {
    /// Bytes needed to store one pixel in this layout.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Argb8888 => 4,
            PixelLayout::Rgb565 | PixelLayout::Argb4444 => 2,
            PixelLayout::Alpha8 => 1,
            PixelLayout::Other(_) => 1,
        }
    }

    /// Row stride in bytes for `width` pixels.
    pub fn row_bytes(self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }
}

impl Default for PixelLayout {
    fn default() -> Self {
        PixelLayout::Argb8888
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_pixel_table() {
        assert_eq!(PixelLayout::Argb8888.bytes_per_pixel(), 4);
        assert_eq!(PixelLayout::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelLayout::Argb4444.bytes_per_pixel(), 2);
        assert_eq!(PixelLayout::Alpha8.bytes_per_pixel(), 1);
        assert_eq!(PixelLayout::Other(42).bytes_per_pixel(), 1);
    }

    #[test]
    fn row_bytes_scales_with_width() {
        assert_eq!(PixelLayout::Argb8888.row_bytes(100), 400);
        assert_eq!(PixelLayout::Rgb565.row_bytes(3), 6);
    }
}
