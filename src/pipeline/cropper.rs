//! The single-image crop pipeline.
//!
//! [`SmartCropper`] chains decoding, region detection, candidate selection,
//! orientation, optional profile refinement, rotate-and-crop and measurement.
//! It holds nothing but its configuration, so one instance can serve any
//! number of threads.

use std::path::Path;

use tracing::{debug, info};

use crate::core::config::{ConfigValidator, OutputFormat, PipelineConfig};
use crate::core::errors::PipelineResult;
use crate::domain::{ChipBody, CroppedArtifact, MeasurementRecord, RawFrame};
use crate::pipeline::measurement::measure;
use crate::processors::{CandidateSelector, OrientationSolver, RegionDetector, refine_box};
use crate::utils::{decode_frame, encode_image, rotate_and_crop};

/// Result of processing one encoded image.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Measurements of the chip.
    pub record: MeasurementRecord,
    /// The levelled crop, encoded with the configured output format.
    pub cropped_bytes: Vec<u8>,
}

/// Detects, levels and crops the chip in a photograph.
#[derive(Debug, Clone)]
pub struct SmartCropper {
    config: PipelineConfig,
}

impl SmartCropper {
    /// Creates a cropper after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if any value is out of range.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this cropper runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decodes `bytes` and runs the whole pipeline on them.
    pub fn process(&self, bytes: &[u8]) -> PipelineResult<ProcessOutput> {
        let frame = decode_frame(bytes)?;
        let (record, artifact) = self.process_frame(&frame)?;
        let cropped_bytes = encode_image(&artifact.image, self.config.output_format)?;

        info!(
            width = record.width_px,
            height = record.height_px,
            angle = record.angle_deg,
            clamped = record.clamped,
            "chip cropped"
        );

        Ok(ProcessOutput {
            record,
            cropped_bytes,
        })
    }

    /// Runs the pipeline on an already decoded frame.
    pub fn process_frame(
        &self,
        frame: &RawFrame,
    ) -> PipelineResult<(MeasurementRecord, CroppedArtifact)> {
        let config = &self.config;

        let detection = RegionDetector::new(config).detect(frame)?;
        let candidate = CandidateSelector::new(config).select(
            detection.contours,
            frame.width(),
            frame.height(),
        )?;
        let oriented = OrientationSolver::new(config).solve_candidate(&candidate)?;

        let body = match &config.profile_refinement {
            Some(refinement) => {
                refine_box(&detection.mask, &oriented, refinement, config.min_box_side_px)
            }
            None => ChipBody::unrefined(oriented),
        };
        debug!(
            width = body.oriented.width,
            height = body.oriented.height,
            angle = body.oriented.angle,
            refined = body.refined,
            "chip body"
        );

        let artifact = rotate_and_crop(frame, &body.oriented, config)?;
        let record = measure(&artifact, &body, config.scale_px_per_mm)?;
        Ok((record, artifact))
    }
}

/// Runs the pipeline once with `config`.
///
/// This is the transport-independent entry point; it validates the
/// configuration on every call.
pub fn process(bytes: &[u8], config: &PipelineConfig) -> PipelineResult<ProcessOutput> {
    SmartCropper::new(config.clone())?.process(bytes)
}

/// Name under which the crop of `original` is stored.
///
/// A `capture_` prefix is replaced by `cropped_`; any other name gets the
/// `cropped_` prefix. The extension follows the output format.
pub fn cropped_file_name(original: &str, format: OutputFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let stem = stem.strip_prefix("capture_").unwrap_or(stem);
    format!("cropped_{stem}.{}", format.extension())
}
