//! Foreground segmentation of chip photographs.
//!
//! Chip packages are darker (or, with [`Polarity::Light`], lighter) than the
//! tray they lie on, so a global or local threshold after a light blur is
//! enough to separate them. A closing fills engraved markings and glare
//! inside the body; an opening removes specks and thin lead shadows.

use image::{GrayImage, Luma};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::morphology::{close, open};
use tracing::debug;

use crate::core::config::{BinarizationMethod, PipelineConfig, Polarity};
use crate::domain::{ForegroundMask, RawFrame};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Converts a frame to 8-bit luminance.
pub fn to_grayscale(frame: &RawFrame) -> GrayImage {
    image::imageops::grayscale(frame.pixels())
}

/// Gaussian sigma for a blur of the given radius.
///
/// Matches the usual derivation for a `(2r+1)` wide kernel. Returns `None`
/// when blurring is disabled.
pub fn blur_sigma(radius: u32) -> Option<f32> {
    if radius == 0 {
        return None;
    }
    Some(0.3 * (radius as f32 - 1.0) + 0.8)
}

/// Produces the binary foreground mask of a frame.
pub fn binarize(frame: &RawFrame, config: &PipelineConfig) -> ForegroundMask {
    let mut gray = to_grayscale(frame);

    if config.equalize_histogram {
        gray = equalize_histogram(&gray);
    }
    if let Some(sigma) = blur_sigma(config.blur_radius) {
        gray = gaussian_blur_f32(&gray, sigma);
    }

    let mask = threshold(&gray, config.binarization, config.polarity);

    let mask = if config.close_radius > 0 {
        close(&mask, Norm::LInf, config.close_radius)
    } else {
        mask
    };
    let mask = if config.open_radius > 0 {
        open(&mask, Norm::LInf, config.open_radius)
    } else {
        mask
    };

    ForegroundMask::new(mask)
}

/// Applies the configured threshold to a grayscale image.
///
/// A frame without any contrast yields an empty mask: there is nothing to
/// separate, and any level would either select nothing or everything.
pub fn threshold(gray: &GrayImage, method: BinarizationMethod, polarity: Polarity) -> GrayImage {
    let (width, height) = gray.dimensions();

    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if width == 0 || height == 0 || lo == hi {
        debug!("frame has no contrast, mask is empty");
        return GrayImage::from_pixel(width, height, BACKGROUND);
    }

    match method {
        BinarizationMethod::FixedThreshold { level } => {
            let level = level.unwrap_or_else(|| otsu_level(gray));
            debug!(level, ?polarity, "global threshold");
            GrayImage::from_fn(width, height, |x, y| {
                let value = gray.get_pixel(x, y).0[0];
                let is_foreground = match polarity {
                    Polarity::Dark => value <= level,
                    Polarity::Light => value > level,
                };
                if is_foreground { FOREGROUND } else { BACKGROUND }
            })
        }
        BinarizationMethod::Adaptive {
            block_radius,
            offset,
        } => {
            debug!(block_radius, offset, ?polarity, "adaptive threshold");
            let local_mean = box_filter(gray, block_radius, block_radius);
            let offset = offset as i16;
            GrayImage::from_fn(width, height, |x, y| {
                let value = gray.get_pixel(x, y).0[0] as i16;
                let mean = local_mean.get_pixel(x, y).0[0] as i16;
                let is_foreground = match polarity {
                    Polarity::Dark => value < mean - offset,
                    Polarity::Light => value > mean + offset,
                };
                if is_foreground { FOREGROUND } else { BACKGROUND }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn two_tone(width: u32, height: u32, dark: (u32, u32, u32, u32)) -> GrayImage {
        let (x0, y0, x1, y1) = dark;
        GrayImage::from_fn(width, height, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    fn count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn test_blur_sigma() {
        assert_eq!(blur_sigma(0), None);
        assert!((blur_sigma(2).unwrap() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_otsu_threshold_dark_polarity() {
        let gray = two_tone(40, 40, (10, 10, 30, 20));
        let mask = threshold(&gray, BinarizationMethod::default(), Polarity::Dark);
        assert_eq!(count(&mask), 200);
        assert_eq!(mask.get_pixel(15, 15).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_light_polarity_inverts() {
        let gray = two_tone(40, 40, (10, 10, 30, 20));
        let mask = threshold(&gray, BinarizationMethod::default(), Polarity::Light);
        assert_eq!(count(&mask), 1600 - 200);
    }

    #[test]
    fn test_fixed_level() {
        let gray = two_tone(20, 20, (0, 0, 10, 20));
        let method = BinarizationMethod::FixedThreshold { level: Some(10) };
        assert_eq!(count(&threshold(&gray, method, Polarity::Dark)), 0);
    }

    #[test]
    fn test_adaptive_threshold_finds_dark_block() {
        let gray = two_tone(60, 60, (20, 20, 40, 40));
        let method = BinarizationMethod::Adaptive {
            block_radius: 15,
            offset: 10,
        };
        let mask = threshold(&gray, method, Polarity::Dark);
        assert_eq!(mask.get_pixel(30, 30).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn test_uniform_frame_is_empty() {
        let gray = GrayImage::from_pixel(30, 30, Luma([128]));
        let mask = threshold(&gray, BinarizationMethod::default(), Polarity::Dark);
        assert_eq!(count(&mask), 0);
    }

    #[test]
    fn test_binarize_removes_specks() {
        let mut img = RgbImage::from_pixel(80, 80, Rgb([220, 220, 220]));
        for y in 20..60 {
            for x in 20..60 {
                img.put_pixel(x, y, Rgb([25, 25, 25]));
            }
        }
        img.put_pixel(5, 5, Rgb([25, 25, 25]));

        let config = PipelineConfig::default().with_blur_radius(0);
        let mask = binarize(&RawFrame::new(img), &config);
        assert_eq!(mask.as_image().get_pixel(5, 5).0[0], 0);
        assert_eq!(mask.as_image().get_pixel(40, 40).0[0], 255);
        assert_eq!(mask.foreground_count(), 1600);
    }

    #[test]
    fn test_default_morphology_fills_marking_and_drops_thin_lead() {
        let mut img = RgbImage::from_pixel(160, 120, Rgb([220, 220, 220]));
        let dark = Rgb([25, 25, 25]);
        for y in 40..80 {
            for x in 40..120 {
                img.put_pixel(x, y, dark);
            }
        }
        // A light engraved dot on the package top.
        for y in 55..63 {
            for x in 70..78 {
                img.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        // A 6 px lead and a 12 px lead below the body.
        for y in 80..95 {
            for x in (50..56).chain(90..102) {
                img.put_pixel(x, y, dark);
            }
        }

        let config = PipelineConfig::default().with_blur_radius(0);
        let mask = binarize(&RawFrame::new(img), &config);
        let mask = mask.as_image();
        assert_eq!(mask.get_pixel(73, 58).0[0], 255);
        assert_eq!(mask.get_pixel(52, 90).0[0], 0);
        assert_eq!(mask.get_pixel(95, 90).0[0], 255);
    }
}
