//! Decoded frames and the foreground masks derived from them.

use image::{DynamicImage, GrayImage, RgbImage};

/// A decoded photograph, immutable for the rest of the pipeline run.
///
/// Pixels are held as 8-bit RGB regardless of the source encoding; the
/// source channel count is kept for reporting.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pixels: RgbImage,
    channels: u8,
}

impl RawFrame {
    /// Wraps an RGB image.
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels,
            channels: 3,
        }
    }

    /// Converts any decoded image into a frame.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let channels = image.color().channel_count();
        Self {
            pixels: image.to_rgb8(),
            channels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Channel count of the encoded source.
    pub fn channel_count(&self) -> u8 {
        self.channels
    }

    /// Total number of pixels.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// The RGB pixel grid.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Binary mask with the same extent as its frame.
///
/// Foreground pixels are 255, background pixels 0.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    mask: GrayImage,
}

impl ForegroundMask {
    /// Wraps a binary image.
    pub fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// The underlying binary image.
    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }

    /// Number of foreground pixels.
    pub fn foreground_count(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] > 0).count()
    }
}
