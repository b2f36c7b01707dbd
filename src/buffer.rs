// this_file: src/buffer.rs

//! Owned pixel allocations.
//!
//! A [`PixelBuffer`] is one fixed-size block of pixel memory. Its capacity is
//! decided at allocation time and never grows; reuse works by reshaping the
//! same block for a different width, height or layout as long as the new
//! shape fits.

use crate::error::{Error, Result};
use crate::layout::PixelLayout;

/// Shape and size of a buffer, detached from its memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Bytes per row for the current shape
    pub row_bytes: usize,
    /// Size of the underlying allocation
    pub capacity_bytes: usize,
}

impl BufferInfo {
    /// Bytes the current shape occupies (`row_bytes * height`).
    pub fn byte_count(&self) -> usize {
        self.row_bytes * self.height as usize
    }
}

/// Fixed-capacity pixel memory block.
#[derive(Debug)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    layout: PixelLayout,
    mutable: bool,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer sized exactly for `width x height` pixels.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        let size = Self::required_bytes(width, height, layout)?;
        Ok(Self::from_parts(vec![0u8; size], width, height, layout))
    }

    /// Allocate `capacity_bytes`, shaped as `width x height`.
    ///
    /// Fails when the shape does not fit the capacity.
    pub fn with_capacity(
        capacity_bytes: usize,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self> {
        let size = Self::required_bytes(width, height, layout)?;
        if size > capacity_bytes {
            return Err(Error::InvalidInput(format!(
                "{}x{} {:?} needs {} bytes, capacity is {}",
                width, height, layout, size, capacity_bytes
            )));
        }
        Ok(Self::from_parts(vec![0u8; capacity_bytes], width, height, layout))
    }

    fn from_parts(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            data,
            width,
            height,
            layout,
            mutable: true,
        }
    }

    fn required_bytes(width: u32, height: u32, layout: PixelLayout) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "buffer dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        layout
            .row_bytes(width)
            .checked_mul(height as usize)
            .ok_or_else(|| Error::InvalidInput(format!("{}x{} overflows", width, height)))
    }

    /// Mark the buffer read-only. Immutable buffers are never reused.
    pub fn into_immutable(mut self) -> Self {
        self.mutable = false;
        self
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            width: self.width,
            height: self.height,
            layout: self.layout,
            row_bytes: self.layout.row_bytes(self.width),
            capacity_bytes: self.data.len(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    /// Bytes used by the current shape.
    pub fn byte_count(&self) -> usize {
        self.info().byte_count()
    }

    /// Pixel bytes of the current shape.
    pub fn pixels(&self) -> &[u8] {
        let used = self.byte_count();
        &self.data[..used]
    }

    /// Mutable pixel bytes of the current shape.
    pub fn pixels_mut(&mut self) -> Result<&mut [u8]> {
        if !self.mutable {
            return Err(Error::InvalidInput("buffer is immutable".into()));
        }
        let used = self.byte_count();
        Ok(&mut self.data[..used])
    }

    /// Reshape the allocation for a new image without reallocating.
    ///
    /// The used region is zeroed. Fails when the buffer is immutable or the
    /// new shape needs more than the allocated capacity.
    pub fn reconfigure(&mut self, width: u32, height: u32, layout: PixelLayout) -> Result<()> {
        if !self.mutable {
            return Err(Error::InvalidInput("cannot reconfigure an immutable buffer".into()));
        }
        let size = Self::required_bytes(width, height, layout)?;
        if size > self.data.len() {
            return Err(Error::InvalidInput(format!(
                "{}x{} {:?} needs {} bytes, capacity is {}",
                width,
                height,
                layout,
                size,
                self.data.len()
            )));
        }
        self.width = width;
        self.height = height;
        self.layout = layout;
        self.data[..size].fill(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_sized_to_shape() {
        let buf = PixelBuffer::new(10, 5, PixelLayout::Argb8888).unwrap();
        let info = buf.info();
        assert_eq!(info.row_bytes, 40);
        assert_eq!(info.byte_count(), 200);
        assert_eq!(info.capacity_bytes, 200);
        assert!(buf.is_mutable());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(PixelBuffer::new(0, 5, PixelLayout::Alpha8).is_err());
        assert!(PixelBuffer::new(5, 0, PixelLayout::Alpha8).is_err());
    }

    #[test]
    fn reconfigure_within_capacity() {
        let mut buf = PixelBuffer::new(100, 100, PixelLayout::Argb8888).unwrap();
        buf.pixels_mut().unwrap()[0] = 7;
        buf.reconfigure(200, 100, PixelLayout::Rgb565).unwrap();
        assert_eq!(buf.width(), 200);
        assert_eq!(buf.layout(), PixelLayout::Rgb565);
        assert_eq!(buf.capacity_bytes(), 40_000);
        assert_eq!(buf.pixels()[0], 0);
    }

    #[test]
    fn reconfigure_beyond_capacity_fails() {
        let mut buf = PixelBuffer::new(10, 10, PixelLayout::Alpha8).unwrap();
        assert!(buf.reconfigure(11, 10, PixelLayout::Alpha8).is_err());
        assert_eq!(buf.width(), 10);
    }

    #[test]
    fn immutable_buffer_refuses_writes() {
        let mut buf = PixelBuffer::new(2, 2, PixelLayout::Alpha8)
            .unwrap()
            .into_immutable();
        assert!(buf.pixels_mut().is_err());
        assert!(buf.reconfigure(1, 1, PixelLayout::Alpha8).is_err());
    }

    #[test]
    fn with_capacity_keeps_headroom() {
        let buf = PixelBuffer::with_capacity(1000, 10, 10, PixelLayout::Argb8888).unwrap();
        assert_eq!(buf.capacity_bytes(), 1000);
        assert_eq!(buf.byte_count(), 400);
        assert!(PixelBuffer::with_capacity(100, 10, 10, PixelLayout::Argb8888).is_err());
    }
}
