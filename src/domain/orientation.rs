//! Oriented chip boxes and the angle normalisation rule.
//!
//! A rectangle is the same shape when rotated by 90 degrees with its sides
//! swapped, so every detected box is folded into the half-open range
//! `[-45, 45)` degrees. After folding, `width` is always the extent along the
//! near-horizontal axis of the levelled crop.

use serde::{Deserialize, Serialize};

use crate::processors::geometry::{MinAreaRect, Point};

/// Lower bound (inclusive) of a normalised angle, in degrees.
pub const ANGLE_MIN: f32 = -45.0;
/// Upper bound (exclusive) of a normalised angle, in degrees.
pub const ANGLE_MAX: f32 = 45.0;

/// A chip box with its rotation normalised into `[-45, 45)` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    /// Box center in frame coordinates.
    pub center: Point,
    /// Extent along the axis at `angle`.
    pub width: f32,
    /// Extent along the perpendicular axis.
    pub height: f32,
    /// Direction of the width axis in degrees (image coordinates, y down).
    ///
    /// Rotating the frame counter-clockwise by this angle levels the box.
    pub angle: f32,
}

impl OrientedBox {
    /// Folds a raw rotated rectangle into the normalised representation.
    pub fn from_min_area_rect(rect: &MinAreaRect) -> Self {
        let (angle, swapped) = normalize_angle(rect.angle);
        let (width, height) = if swapped {
            (rect.height, rect.width)
        } else {
            (rect.width, rect.height)
        };

        Self {
            center: rect.center,
            width: width.max(0.0),
            height: height.max(0.0),
            angle,
        }
    }

    /// Area of the box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Gets the length of the shorter side of the box.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// The same box expressed as a [`MinAreaRect`].
    pub fn to_rect(&self) -> MinAreaRect {
        MinAreaRect {
            center: self.center,
            width: self.width,
            height: self.height,
            angle: self.angle,
        }
    }
}

/// Folds `angle` (degrees) into `[-45, 45)`.
///
/// Returns the folded angle and whether width and height must be swapped,
/// which happens whenever the fold moved the angle by an odd multiple of 90.
pub fn normalize_angle(angle: f32) -> (f32, bool) {
    if !angle.is_finite() {
        return (0.0, false);
    }

    let quarter_turns = ((angle - ANGLE_MIN) / 90.0).floor();
    let mut folded = angle - quarter_turns * 90.0;
    let mut turns = quarter_turns as i64;

    // Rounding can leave the value a hair outside the interval.
    if folded >= ANGLE_MAX {
        folded -= 90.0;
        turns += 1;
    } else if folded < ANGLE_MIN {
        folded += 90.0;
        turns -= 1;
    }

    (folded, turns.rem_euclid(2) == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(width: f32, height: f32, angle: f32) -> MinAreaRect {
        MinAreaRect {
            center: Point::new(50.0, 50.0),
            width,
            height,
            angle,
        }
    }

    #[test]
    fn test_normalize_angle_range() {
        for raw in [-720.0, -180.0, -90.0, -45.0, -44.9, 0.0, 17.0, 44.99, 45.0, 90.0, 135.0, 359.0] {
            let (folded, _) = normalize_angle(raw);
            assert!((ANGLE_MIN..ANGLE_MAX).contains(&folded), "{raw} -> {folded}");
        }
        assert_eq!(normalize_angle(45.0), (-45.0, true));
        assert_eq!(normalize_angle(-45.0), (-45.0, false));
        assert_eq!(normalize_angle(180.0), (0.0, false));
    }

    #[test]
    fn test_swap_on_quarter_turn() {
        let upright = OrientedBox::from_min_area_rect(&rect(200.0, 80.0, 10.0));
        let on_side = OrientedBox::from_min_area_rect(&rect(80.0, 200.0, 100.0));
        let flipped = OrientedBox::from_min_area_rect(&rect(200.0, 80.0, -170.0));

        for b in [upright, on_side, flipped] {
            assert!((b.angle - 10.0).abs() < 1e-4);
            assert_eq!(b.width, 200.0);
            assert_eq!(b.height, 80.0);
        }
    }

    #[test]
    fn test_negative_angle_swap() {
        let b = OrientedBox::from_min_area_rect(&rect(30.0, 60.0, -80.0));
        assert!((b.angle - 10.0).abs() < 1e-4);
        assert_eq!((b.width, b.height), (60.0, 30.0));
    }

    #[test]
    fn test_non_finite_angle() {
        let b = OrientedBox::from_min_area_rect(&rect(30.0, 60.0, f32::NAN));
        assert_eq!(b.angle, 0.0);
    }
}
