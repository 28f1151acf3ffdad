//! Region detection: foreground mask and external contours.
//!
//! The detector is a generic shape extractor. It does not try to recognise
//! chips; it hands every external contour of a plausible size to the
//! candidate selector.

use imageproc::contours::{BorderType, find_contours};
use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::{ForegroundMask, RawFrame};
use crate::processors::binarize::binarize;
use crate::processors::geometry::Polygon;

/// Mask and contours extracted from one frame.
#[derive(Debug, Clone)]
pub struct RegionDetection {
    /// The binary foreground mask.
    pub mask: ForegroundMask,
    /// External contours whose area lies within the configured bounds.
    pub contours: Vec<Polygon>,
    /// Number of external contours traced before area filtering.
    pub traced: usize,
}

/// Extracts candidate contours from a frame.
#[derive(Debug, Clone, Copy)]
pub struct RegionDetector<'a> {
    config: &'a PipelineConfig,
}

impl<'a> RegionDetector<'a> {
    /// Creates a detector for the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Binarizes the frame and traces its external contours.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoRegionDetected`] when no contour is inside
    /// the `[min_region_area_fraction, max_region_area_fraction]` band of the
    /// frame area.
    pub fn detect(&self, frame: &RawFrame) -> PipelineResult<RegionDetection> {
        let mask = binarize(frame, self.config);
        let (traced, contours) = self.external_contours(&mask);

        let frame_area = frame.area() as f32;
        let min_area = frame_area * self.config.min_region_area_fraction;
        let max_area = frame_area * self.config.max_region_area_fraction;

        let contours: Vec<Polygon> = contours
            .into_iter()
            .filter(|polygon| {
                let area = polygon.area();
                area >= min_area && area <= max_area
            })
            .collect();

        debug!(
            traced,
            kept = contours.len(),
            min_area,
            max_area,
            "contours filtered by area"
        );

        if contours.is_empty() {
            return Err(PipelineError::NoRegionDetected {
                contours: traced,
                min_area,
            });
        }

        Ok(RegionDetection {
            mask,
            contours,
            traced,
        })
    }

    /// Outer borders of top-level components; holes and nested islands are skipped.
    fn external_contours(&self, mask: &ForegroundMask) -> (usize, Vec<Polygon>) {
        let polygons: Vec<Polygon> = find_contours::<u32>(mask.as_image())
            .iter()
            .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
            .map(Polygon::from_contour)
            .collect();
        let traced = polygons.len();
        let polygons = polygons.into_iter().filter(|p| p.len() >= 3).collect();
        (traced, polygons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use image::{Rgb, RgbImage};

    fn frame_with_blocks(blocks: &[(u32, u32, u32, u32)]) -> RawFrame {
        let mut img = RgbImage::from_pixel(200, 150, Rgb([230, 230, 230]));
        for &(x0, y0, x1, y1) in blocks {
            for y in y0..y1 {
                for x in x0..x1 {
                    img.put_pixel(x, y, Rgb([20, 20, 20]));
                }
            }
        }
        RawFrame::new(img)
    }

    #[test]
    fn test_detects_single_block() {
        let config = PipelineConfig::default();
        let frame = frame_with_blocks(&[(50, 40, 150, 100)]);
        let detection = RegionDetector::new(&config).detect(&frame).unwrap();

        assert_eq!(detection.contours.len(), 1);
        let area = detection.contours[0].area();
        // Border pixel centres sit half a pixel inside the block.
        assert!((area - 99.0 * 59.0).abs() < 400.0, "area {area}");
    }

    #[test]
    fn test_hole_does_not_create_candidate() {
        let config = PipelineConfig::default().with_close_radius(0).with_open_radius(0);
        let mut img = RgbImage::from_pixel(200, 150, Rgb([230, 230, 230]));
        for y in 30..120 {
            for x in 40..160 {
                let inside_hole = (80..120).contains(&x) && (60..90).contains(&y);
                if !inside_hole {
                    img.put_pixel(x, y, Rgb([20, 20, 20]));
                }
            }
        }
        let detection = RegionDetector::new(&config)
            .detect(&RawFrame::new(img))
            .unwrap();
        assert_eq!(detection.contours.len(), 1);
    }

    #[test]
    fn test_uniform_frame_has_no_region() {
        let config = PipelineConfig::default();
        let err = RegionDetector::new(&config)
            .detect(&frame_with_blocks(&[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoRegionDetected);
    }

    #[test]
    fn test_specks_are_rejected() {
        let config = PipelineConfig::default()
            .with_close_radius(0)
            .with_open_radius(0)
            .with_blur_radius(0);
        let frame = frame_with_blocks(&[(10, 10, 13, 13), (100, 60, 104, 64), (180, 120, 182, 122)]);
        let err = RegionDetector::new(&config).detect(&frame).unwrap_err();
        match err {
            PipelineError::NoRegionDetected { contours, .. } => assert_eq!(contours, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
