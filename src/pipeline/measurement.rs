//! Packaging of crop results into measurement records.

use crate::core::config::ConfigError;
use crate::core::errors::PipelineResult;
use crate::domain::{ChipBody, CroppedArtifact, MeasurementRecord};

/// Builds the [`MeasurementRecord`] of a successful run.
///
/// Pixel dimensions are those of the crop actually produced. When
/// `scale_px_per_mm` is given, physical dimensions are the pixel dimensions
/// divided by it; otherwise they are left out.
///
/// # Errors
///
/// Returns [`crate::core::errors::PipelineError::InvalidConfiguration`] for a scale that is not a
/// finite positive number.
pub fn measure(
    artifact: &CroppedArtifact,
    body: &ChipBody,
    scale_px_per_mm: Option<f32>,
) -> PipelineResult<MeasurementRecord> {
    if let Some(scale) = scale_px_per_mm
        && !(scale.is_finite() && scale > 0.0)
    {
        return Err(ConfigError::OutOfRange {
            field: "scale_px_per_mm",
            value: scale.to_string(),
            expected: "a finite value > 0",
        }
        .into());
    }

    let width_px = artifact.width();
    let height_px = artifact.height();
    let oriented = &body.oriented;

    Ok(MeasurementRecord {
        width_px,
        height_px,
        angle_deg: artifact.angle,
        body_width_px: oriented.width,
        body_height_px: oriented.height,
        center_x: oriented.center.x,
        center_y: oriented.center.y,
        requested_width_px: artifact.requested_width,
        requested_height_px: artifact.requested_height,
        clamped: artifact.clamped,
        refined: body.refined,
        package: body.package,
        scale_px_per_mm,
        width_mm: scale_px_per_mm.map(|scale| width_px as f32 / scale),
        height_mm: scale_px_per_mm.map(|scale| height_px as f32 / scale),
    })
}
