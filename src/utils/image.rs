//! Decoding of input photographs and encoding of crops.
//!
//! This module is the byte boundary of the pipeline: everything before it is
//! an opaque buffer supplied by the caller, everything after it is a pixel
//! grid.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::debug;

use crate::core::config::OutputFormat;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::RawFrame;

/// Decodes an encoded image buffer into a frame.
///
/// The format is guessed from the buffer contents, never from a file name.
///
/// # Arguments
///
/// * `bytes` - The encoded image
///
/// # Returns
///
/// * `Ok(RawFrame)` - The decoded frame
/// * `Err(PipelineError::Decode)` - If the buffer is not a supported raster
///   image, or is truncated or corrupt
pub fn decode_frame(bytes: &[u8]) -> PipelineResult<RawFrame> {
    let image = image::load_from_memory(bytes).map_err(PipelineError::Decode)?;
    let frame = RawFrame::from_dynamic(image);
    debug!(
        width = frame.width(),
        height = frame.height(),
        channels = frame.channel_count(),
        "decoded frame"
    );
    Ok(frame)
}

/// Reads and decodes an image file.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read and
/// [`PipelineError::Decode`] if its contents are not an image.
pub fn load_frame(path: &Path) -> PipelineResult<RawFrame> {
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::io(format!("reading {}", path.display()), e))?;
    decode_frame(&bytes)
}

/// Encodes an RGB image with the requested format.
///
/// # Arguments
///
/// * `image` - The image to encode
/// * `format` - Target encoding
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - The encoded bytes
/// * `Err(PipelineError::Encode)` - If the encoder fails
pub fn encode_image(image: &RgbImage, format: OutputFormat) -> PipelineResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgb8(image.clone())
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(PipelineError::Encode)?;
        }
        OutputFormat::Jpeg { quality } => {
            JpegEncoder::new_with_quality(&mut bytes, quality)
                .encode_image(image)
                .map_err(PipelineError::Encode)?;
        }
    }
    Ok(bytes)
}
