//! Outputs of a successful pipeline run.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::body::PackageClass;

/// The levelled, cropped chip image.
#[derive(Debug, Clone)]
pub struct CroppedArtifact {
    /// The cropped pixels.
    pub image: RgbImage,
    /// Corrective angle that was applied, degrees, counter-clockwise positive.
    pub angle: f32,
    /// Window width before clamping to the frame.
    pub requested_width: f32,
    /// Window height before clamping to the frame.
    pub requested_height: f32,
    /// True when the frame edge forced the window smaller than requested.
    pub clamped: bool,
}

impl CroppedArtifact {
    /// Achieved crop width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Achieved crop height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Measurements of one chip, created once per successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Width of the crop actually produced, in pixels.
    pub width_px: u32,
    /// Height of the crop actually produced, in pixels.
    pub height_px: u32,
    /// Corrective angle in degrees, normalised to `[-45, 45)`.
    pub angle_deg: f32,
    /// Width of the detected body box (refined if refinement ran).
    pub body_width_px: f32,
    /// Height of the detected body box (refined if refinement ran).
    pub body_height_px: f32,
    /// Body center in the source frame.
    pub center_x: f32,
    /// Body center in the source frame.
    pub center_y: f32,
    /// Window width requested (body plus margins) before clamping.
    pub requested_width_px: f32,
    /// Window height requested (body plus margins) before clamping.
    pub requested_height_px: f32,
    /// Whether the window was shrunk to fit the frame.
    pub clamped: bool,
    /// Whether profile refinement tightened the body box.
    ///
    /// False when refinement was off, and also when it ran but found no
    /// usable profile, in which case the detected box was kept.
    #[serde(default)]
    pub refined: bool,
    /// Package family the refinement cut-offs were chosen for.
    #[serde(default)]
    pub package: Option<PackageClass>,
    /// Scale used for physical units, if any.
    pub scale_px_per_mm: Option<f32>,
    /// Crop width in millimetres, when a scale was supplied.
    pub width_mm: Option<f32>,
    /// Crop height in millimetres, when a scale was supplied.
    pub height_mm: Option<f32>,
}
