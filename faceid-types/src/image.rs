//! Preview image structures
//!
//! An [`Image`] is generic over its pixel buffer so the same header can
//! describe a borrowed frame handed to a preview callback, a caller-owned
//! output buffer for a conversion, or an owned frame produced by a simulator.
//! The header fields are always copied by value; the buffer is only ever
//! re-borrowed.

use std::fmt;

use crate::error::{Error, Result};

/// Per-frame metadata reported by the camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ImageMetadata {
    /// Flood LED was on during capture
    pub led: bool,

    /// Dot projector was on during capture
    pub projector: bool,

    /// Sensor that produced the frame (0 = left, 1 = right)
    pub sensor_id: u32,

    /// Capture status code reported by the device
    pub status: u32,

    /// Device timestamp in milliseconds
    pub timestamp: u32,
}

/// Preview image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image<B> {
    /// Pixel data
    pub buffer: B,

    /// Number of valid bytes in `buffer`
    pub size: u32,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Bytes per row
    pub stride: u32,

    /// Frame number
    pub number: u32,

    /// Capture metadata
    pub metadata: ImageMetadata,
}

/// Frame borrowed for the duration of a callback
pub type ImageRef<'a> = Image<&'a [u8]>;

/// Caller-provided output buffer
pub type ImageMut<'a> = Image<&'a mut [u8]>;

/// Frame that owns its pixels
pub type OwnedImage = Image<Vec<u8>>;

impl<B: AsRef<[u8]>> Image<B> {
    /// Create an image whose `size` covers the whole buffer
    pub fn new(buffer: B, width: u32, height: u32, stride: u32) -> Self {
        let size = buffer.as_ref().len() as u32;
        Self {
            buffer,
            size,
            width,
            height,
            stride,
            number: 0,
            metadata: ImageMetadata::default(),
        }
    }

    /// Set frame number
    pub fn with_number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    /// Set capture metadata
    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Valid pixel bytes
    pub fn data(&self) -> &[u8] {
        let buf = self.buffer.as_ref();
        &buf[..(self.size as usize).min(buf.len())]
    }

    /// Borrow this image without copying pixels
    pub fn view(&self) -> ImageRef<'_> {
        Image {
            buffer: self.buffer.as_ref(),
            size: self.size,
            width: self.width,
            height: self.height,
            stride: self.stride,
            number: self.number,
            metadata: self.metadata,
        }
    }

    /// Check that the header describes a buffer that actually holds
    /// `height` rows of `stride` bytes
    pub fn validate(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if self.size as usize > len {
            return Err(Error::Validation(format!(
                "image size {} exceeds buffer length {}",
                self.size, len
            )));
        }

        let required = self.stride as u64 * self.height as u64;
        if required > self.size as u64 {
            return Err(Error::Validation(format!(
                "{}x{} image with stride {} needs {} bytes, has {}",
                self.width, self.height, self.stride, required, self.size
            )));
        }

        Ok(())
    }
}

impl<B: AsRef<[u8]>> fmt::Display for Image<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image[#{} {}x{} stride={} size={} sensor={} ts={}]",
            self.number,
            self.width,
            self.height,
            self.stride,
            self.size,
            self.metadata.sensor_id,
            self.metadata.timestamp
        )
    }
}
