//! Candidate chip regions.

use serde::{Deserialize, Serialize};

use crate::processors::geometry::{MinAreaRect, Point, Polygon};

/// A traced contour together with the shape scores used to rank it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The outer contour of the region.
    pub contour: Polygon,
    /// Enclosed contour area in square pixels.
    pub area: f32,
    /// Minimum-area rectangle around the contour.
    pub rect: MinAreaRect,
    /// Contour area divided by rectangle area; 1.0 for a perfect rectangle.
    pub extent: f32,
    /// Long side over short side of the rectangle.
    pub aspect_ratio: f32,
    /// Distance from the rectangle center to the frame center.
    pub center_distance: f32,
}

impl Candidate {
    /// Scores a contour against a frame of the given size.
    pub fn from_contour(contour: Polygon, frame_width: u32, frame_height: u32) -> Self {
        let area = contour.area();
        let rect = contour.min_area_rect();
        let rect_area = rect.area();
        let extent = if rect_area > f32::EPSILON {
            (area / rect_area).min(1.0)
        } else {
            0.0
        };
        let aspect_ratio = if rect.min_side() > f32::EPSILON {
            rect.width.max(rect.height) / rect.min_side()
        } else {
            f32::INFINITY
        };
        let frame_center = Point::new(frame_width as f32 / 2.0, frame_height as f32 / 2.0);
        let center_distance = rect.center.distance(&frame_center);

        Self {
            contour,
            area,
            rect,
            extent,
            aspect_ratio,
            center_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_scores() {
        let candidate = Candidate::from_contour(Polygon::from_coords(0.0, 0.0, 40.0, 10.0), 40, 10);
        assert!((candidate.area - 400.0).abs() < 1e-3);
        assert!((candidate.extent - 1.0).abs() < 1e-3);
        assert!((candidate.aspect_ratio - 4.0).abs() < 1e-3);
        assert!(candidate.center_distance < 1e-3);
    }

    #[test]
    fn test_l_shape_has_low_extent() {
        let l_shape = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 90.0),
            Point::new(100.0, 90.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]);
        let candidate = Candidate::from_contour(l_shape, 200, 200);
        assert!(candidate.extent < 0.3, "extent {}", candidate.extent);
    }
}
