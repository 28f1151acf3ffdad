//! Rotation and cropping of chip photographs.
//!
//! This module levels a frame by rotating it about the chip center and cuts
//! the axis-aligned crop window out of the rotated frame. Rotation uses
//! inverse mapping: every destination pixel is traced back through the
//! inverse transform and sampled from the source.

use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, imageops};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::{CroppedArtifact, OrientedBox, RawFrame};
use crate::processors::geometry::Point;

/// An axis-aligned window inside a rotated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// Left column of the window.
    pub x: u32,
    /// Top row of the window.
    pub y: u32,
    /// Width of the window in pixels.
    pub width: u32,
    /// Height of the window in pixels.
    pub height: u32,
    /// True when the frame bounds forced the window smaller than requested.
    pub clamped: bool,
}

/// Builds the homogeneous matrix rotating points by `degrees` about `center`.
///
/// Coordinates are image coordinates (y down), so a positive angle turns the
/// x axis towards the y axis, which is clockwise as viewed.
///
/// # Arguments
///
/// * `center` - The fixed point of the rotation
/// * `degrees` - The rotation angle in degrees
///
/// # Returns
///
/// The 3x3 transformation matrix.
pub fn rotation_about(center: Point, degrees: f32) -> Matrix3<f32> {
    let (sin_a, cos_a) = degrees.to_radians().sin_cos();
    let (cx, cy) = (center.x, center.y);

    Matrix3::new(
        cos_a,
        -sin_a,
        cx - cos_a * cx + sin_a * cy,
        sin_a,
        cos_a,
        cy - sin_a * cx - cos_a * cy,
        0.0,
        0.0,
        1.0,
    )
}

/// Rotates a frame counter-clockwise (as viewed) by `angle` degrees about `center`.
///
/// The output keeps the frame's dimensions. Areas with no source pixel are
/// filled with black; colours are sampled bilinearly.
///
/// # Arguments
///
/// * `image` - The frame to rotate
/// * `center` - The fixed point of the rotation
/// * `angle` - The corrective angle in degrees
///
/// # Returns
///
/// The rotated frame.
pub fn rotate_image(image: &RgbImage, center: Point, angle: f32) -> RgbImage {
    // Destination pixels map back to the source by the opposite rotation.
    let inverse = rotation_about(center, angle);
    warp(image, &inverse, |x, y| bilinear_interpolate(image, x, y))
}

/// Rotates a binary mask like [`rotate_image`], with nearest-neighbour sampling.
pub fn rotate_mask(mask: &GrayImage, center: Point, angle: f32) -> GrayImage {
    let inverse = rotation_about(center, angle);
    warp(mask, &inverse, |x, y| nearest(mask, x, y))
}

/// Computes the crop window for a box of `width` x `height` centered at `center`.
///
/// The window is shrunk symmetrically about the center until it fits the
/// frame bounds, so the center never moves. Sizes are rounded to whole pixels.
///
/// # Arguments
///
/// * `center` - Window center, pixel-center coordinates
/// * `width` - Requested window width
/// * `height` - Requested window height
/// * `bounds` - Frame width and height
///
/// # Returns
///
/// The achievable window, possibly empty when the center lies on or outside
/// the frame edge.
pub fn crop_window(center: Point, width: f32, height: f32, bounds: (u32, u32)) -> CropWindow {
    let (x, w, clamped_x) = clamp_axis(center.x, width, bounds.0);
    let (y, h, clamped_y) = clamp_axis(center.y, height, bounds.1);

    CropWindow {
        x,
        y,
        width: w,
        height: h,
        clamped: clamped_x || clamped_y,
    }
}

/// Levels the box and cuts it, with margins, out of the frame.
///
/// The whole frame is rotated about the box center by the box angle, then a
/// window of the box size plus `margin_px + margin_fraction * side` on every
/// side is cut around the same center. A window that would leave the frame is
/// shrunk, never padded.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] when the achievable window
/// is empty on either axis.
pub fn rotate_and_crop(
    frame: &RawFrame,
    oriented: &OrientedBox,
    config: &PipelineConfig,
) -> PipelineResult<CroppedArtifact> {
    let margin_x = config.margin_px as f32 + config.margin_fraction * oriented.width;
    let margin_y = config.margin_px as f32 + config.margin_fraction * oriented.height;
    let requested_width = oriented.width + 2.0 * margin_x;
    let requested_height = oriented.height + 2.0 * margin_y;

    let window = crop_window(
        oriented.center,
        requested_width,
        requested_height,
        (frame.width(), frame.height()),
    );

    debug!(
        requested_width,
        requested_height,
        x = window.x,
        y = window.y,
        width = window.width,
        height = window.height,
        clamped = window.clamped,
        "crop window"
    );

    if window.width == 0 || window.height == 0 {
        return Err(PipelineError::DegenerateGeometry {
            width: window.width as f32,
            height: window.height as f32,
            min_side: 1.0,
        });
    }

    let rotated = rotate_image(frame.pixels(), oriented.center, oriented.angle);
    let image = imageops::crop_imm(&rotated, window.x, window.y, window.width, window.height)
        .to_image();

    Ok(CroppedArtifact {
        image,
        angle: oriented.angle,
        requested_width,
        requested_height,
        clamped: window.clamped,
    })
}

/// Clamps one axis of the window.
///
/// Works in pixel-edge coordinates, where the frame spans `[0, limit]` and
/// pixel `i` covers `[i, i + 1]`.
fn clamp_axis(center: f32, requested: f32, limit: u32) -> (u32, u32, bool) {
    let edge_center = center + 0.5;
    let limit = limit as f32;
    let wanted = (requested / 2.0).max(0.0);
    let half = wanted.min(edge_center).min(limit - edge_center).max(0.0);

    let start = (edge_center - half).round().clamp(0.0, limit) as u32;
    let end = (edge_center + half).round().clamp(0.0, limit) as u32;

    (start, end.saturating_sub(start), half + 1e-3 < wanted)
}

/// Inverse-maps every destination pixel through `inverse` and samples it.
///
/// Rows are filled in parallel; each output pixel depends only on its own
/// coordinates, so the result does not depend on scheduling.
fn warp<P, F>(
    src: &ImageBuffer<P, Vec<u8>>,
    inverse: &Matrix3<f32>,
    sample: F,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
    F: Fn(f32, f32) -> P + Sync,
{
    let (width, height) = src.dimensions();
    let mut dst = ImageBuffer::<P, Vec<u8>>::new(width, height);
    if width == 0 || height == 0 {
        return dst;
    }

    let channels = P::CHANNEL_COUNT as usize;
    let buffer: &mut [u8] = &mut dst;

    buffer
        .par_chunks_mut(width as usize * channels)
        .enumerate()
        .for_each(|(dst_y, row_buffer)| {
            for dst_x in 0..width {
                let src_point = inverse * Vector3::new(dst_x as f32, dst_y as f32, 1.0);
                let pixel = sample(src_point.x, src_point.y);
                let index = dst_x as usize * channels;
                row_buffer[index..index + channels].copy_from_slice(pixel.channels());
            }
        });

    dst
}

/// Whether `(x, y)` falls on a pixel of a `width` x `height` image.
fn in_bounds(x: f32, y: f32, width: u32, height: u32) -> bool {
    x >= -0.5 && y >= -0.5 && x < width as f32 - 0.5 && y < height as f32 - 0.5
}

/// Performs bilinear interpolation to get a pixel value at non-integer coordinates.
///
/// Points off the image are black. Points within half a pixel of the border
/// are clamped onto it.
fn bilinear_interpolate(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    if !in_bounds(x, y, width, height) {
        return Rgb([0, 0, 0]);
    }

    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);

    let x1 = x.floor() as u32;
    let y1 = y.floor() as u32;
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);

    let dx = x - x1 as f32;
    let dy = y - y1 as f32;

    let p11 = image.get_pixel(x1, y1);
    let p12 = image.get_pixel(x1, y2);
    let p21 = image.get_pixel(x2, y1);
    let p22 = image.get_pixel(x2, y2);

    let mut result = [0u8; 3];
    for (i, result_channel) in result.iter_mut().enumerate() {
        let val = (1.0 - dx) * (1.0 - dy) * p11.0[i] as f32
            + dx * (1.0 - dy) * p21.0[i] as f32
            + (1.0 - dx) * dy * p12.0[i] as f32
            + dx * dy * p22.0[i] as f32;
        *result_channel = val.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}

fn nearest(mask: &GrayImage, x: f32, y: f32) -> Luma<u8> {
    let (width, height) = mask.dimensions();
    if !in_bounds(x, y, width, height) {
        return Luma([0]);
    }
    let px = (x.round().max(0.0) as u32).min(width - 1);
    let py = (y.round().max(0.0) as u32).min(height - 1);
    *mask.get_pixel(px, py)
}
