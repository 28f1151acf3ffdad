//! Configuration of a single crop pipeline run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator};
use crate::core::constants::{
    DEFAULT_AREA_TIE_TOLERANCE, DEFAULT_BLUR_RADIUS, DEFAULT_CLOSE_RADIUS, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_REGION_AREA_FRACTION, DEFAULT_MIN_BOX_SIDE_PX, DEFAULT_MIN_REGION_AREA_FRACTION,
    DEFAULT_OPEN_RADIUS, DEFAULT_RECTANGULARITY_THRESHOLD,
};

/// How the grayscale frame is turned into a foreground mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BinarizationMethod {
    /// One global level for the whole frame.
    ///
    /// `level: None` picks the level with Otsu's method.
    FixedThreshold {
        #[serde(default)]
        level: Option<u8>,
    },
    /// Compare every pixel against the mean of its `(2r+1)^2` neighbourhood.
    ///
    /// A pixel is foreground when it differs from the local mean by more than
    /// `offset` in the direction given by [`Polarity`].
    Adaptive {
        #[serde(default = "BinarizationMethod::default_block_radius")]
        block_radius: u32,
        #[serde(default = "BinarizationMethod::default_offset")]
        offset: u8,
    },
}

impl BinarizationMethod {
    fn default_block_radius() -> u32 {
        25
    }

    fn default_offset() -> u8 {
        10
    }
}

impl Default for BinarizationMethod {
    fn default() -> Self {
        BinarizationMethod::FixedThreshold { level: None }
    }
}

/// Brightness of the chip body relative to the tray it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Chip is darker than the background (black epoxy on a light tray).
    #[default]
    Dark,
    /// Chip is lighter than the background.
    Light,
}

/// How the profile cut-off ratios are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSelection {
    /// Classify the package from the shape of its profiles and use the
    /// cut-offs of that family.
    #[default]
    ByPackage,
    /// Always use `row_ratio` and `column_ratio`.
    Fixed,
}

/// Projection-profile refinement of the crop window.
///
/// Leads and pins protrude from the body as thin, sparse structures. Row and
/// column foreground sums of the levelled mask drop sharply where the solid
/// body ends, so keeping only rows and columns above a fraction of the peak
/// trims them away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileRefinement {
    /// Where the cut-off ratios come from.
    #[serde(default)]
    pub selection: ThresholdSelection,
    /// With [`ThresholdSelection::Fixed`], rows whose foreground count
    /// exceeds `row_ratio * max` bound the height.
    #[serde(default = "ProfileRefinement::default_row_ratio")]
    pub row_ratio: f32,
    /// With [`ThresholdSelection::Fixed`], columns whose foreground count
    /// exceeds `column_ratio * max` bound the width.
    #[serde(default = "ProfileRefinement::default_column_ratio")]
    pub column_ratio: f32,
    /// Extra pixels searched around the box on every side.
    #[serde(default = "ProfileRefinement::default_search_padding_px")]
    pub search_padding_px: u32,
}

impl ProfileRefinement {
    /// Refinement with fixed cut-off ratios.
    pub fn fixed(row_ratio: f32, column_ratio: f32) -> Self {
        Self {
            selection: ThresholdSelection::Fixed,
            row_ratio,
            column_ratio,
            ..Self::default()
        }
    }

    fn default_row_ratio() -> f32 {
        0.85
    }

    fn default_column_ratio() -> f32 {
        0.80
    }

    fn default_search_padding_px() -> u32 {
        50
    }
}

impl Default for ProfileRefinement {
    fn default() -> Self {
        Self {
            selection: ThresholdSelection::default(),
            row_ratio: Self::default_row_ratio(),
            column_ratio: Self::default_column_ratio(),
            search_padding_px: Self::default_search_padding_px(),
        }
    }
}

/// Encoding used for the cropped image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutputFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// Baseline JPEG with the given quality (1..=100).
    Jpeg {
        #[serde(default = "OutputFormat::default_quality")]
        quality: u8,
    },
}

impl OutputFormat {
    fn default_quality() -> u8 {
        DEFAULT_JPEG_QUALITY
    }

    /// File extension matching the encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// Configuration threaded through every pipeline invocation.
///
/// There is no process-wide detector state: two invocations with different
/// configurations can run concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Thresholding strategy.
    #[serde(default)]
    pub binarization: BinarizationMethod,

    /// Whether the chip is darker or lighter than the background.
    #[serde(default)]
    pub polarity: Polarity,

    /// Equalise the grayscale histogram before blurring.
    #[serde(default)]
    pub equalize_histogram: bool,

    /// Gaussian blur radius in pixels. `0` disables blurring.
    #[serde(default = "PipelineConfig::default_blur_radius")]
    pub blur_radius: u32,

    /// Radius of the square closing applied to the mask first. `0` skips it.
    #[serde(default = "PipelineConfig::default_close_radius")]
    pub close_radius: u8,

    /// Radius of the square opening applied after the closing. `0` skips it.
    #[serde(default = "PipelineConfig::default_open_radius")]
    pub open_radius: u8,

    /// Contours smaller than this fraction of the frame are speckle.
    #[serde(default = "PipelineConfig::default_min_region_area_fraction")]
    pub min_region_area_fraction: f32,

    /// Contours larger than this fraction of the frame are background.
    #[serde(default = "PipelineConfig::default_max_region_area_fraction")]
    pub max_region_area_fraction: f32,

    /// Minimum ratio of contour area to its minimum-area box area.
    #[serde(default = "PipelineConfig::default_rectangularity_threshold")]
    pub rectangularity_threshold: f32,

    /// Relative area difference below which two candidates tie.
    #[serde(default = "PipelineConfig::default_area_tie_tolerance")]
    pub area_tie_tolerance: f32,

    /// Boxes with a side shorter than this are rejected as slivers.
    #[serde(default = "PipelineConfig::default_min_box_side_px")]
    pub min_box_side_px: f32,

    /// Fixed margin kept around the body on each side.
    #[serde(default)]
    pub margin_px: u32,

    /// Additional margin on each side, as a fraction of the box side.
    #[serde(default)]
    pub margin_fraction: f32,

    /// Optional pin-excluding refinement of the crop window.
    #[serde(default)]
    pub profile_refinement: Option<ProfileRefinement>,

    /// Pixels per millimetre; enables physical dimensions in the record.
    #[serde(default)]
    pub scale_px_per_mm: Option<f32>,

    /// Encoding of the cropped image bytes.
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl PipelineConfig {
    /// Create a new PipelineConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidConfig {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the binarization method.
    pub fn with_binarization(mut self, method: BinarizationMethod) -> Self {
        self.binarization = method;
        self
    }

    /// Set the foreground polarity.
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the blur radius.
    pub fn with_blur_radius(mut self, radius: u32) -> Self {
        self.blur_radius = radius;
        self
    }

    /// Set the closing radius.
    pub fn with_close_radius(mut self, radius: u8) -> Self {
        self.close_radius = radius;
        self
    }

    /// Set the opening radius.
    pub fn with_open_radius(mut self, radius: u8) -> Self {
        self.open_radius = radius;
        self
    }

    /// Set the minimum region area fraction.
    pub fn with_min_region_area_fraction(mut self, fraction: f32) -> Self {
        self.min_region_area_fraction = fraction;
        self
    }

    /// Set the rectangularity threshold.
    pub fn with_rectangularity_threshold(mut self, threshold: f32) -> Self {
        self.rectangularity_threshold = threshold;
        self
    }

    /// Set the minimum box side.
    pub fn with_min_box_side_px(mut self, min_side: f32) -> Self {
        self.min_box_side_px = min_side;
        self
    }

    /// Set the fixed margin.
    pub fn with_margin_px(mut self, margin: u32) -> Self {
        self.margin_px = margin;
        self
    }

    /// Set the relative margin.
    pub fn with_margin_fraction(mut self, fraction: f32) -> Self {
        self.margin_fraction = fraction;
        self
    }

    /// Enable projection-profile refinement.
    pub fn with_profile_refinement(mut self, refinement: Option<ProfileRefinement>) -> Self {
        self.profile_refinement = refinement;
        self
    }

    /// Set the pixel-to-millimetre scale.
    pub fn with_scale_px_per_mm(mut self, scale: Option<f32>) -> Self {
        self.scale_px_per_mm = scale;
        self
    }

    /// Set the output encoding.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    fn default_blur_radius() -> u32 {
        DEFAULT_BLUR_RADIUS
    }

    fn default_close_radius() -> u8 {
        DEFAULT_CLOSE_RADIUS
    }

    fn default_open_radius() -> u8 {
        DEFAULT_OPEN_RADIUS
    }

    fn default_min_region_area_fraction() -> f32 {
        DEFAULT_MIN_REGION_AREA_FRACTION
    }

    fn default_max_region_area_fraction() -> f32 {
        DEFAULT_MAX_REGION_AREA_FRACTION
    }

    fn default_rectangularity_threshold() -> f32 {
        DEFAULT_RECTANGULARITY_THRESHOLD
    }

    fn default_area_tie_tolerance() -> f32 {
        DEFAULT_AREA_TIE_TOLERANCE
    }

    fn default_min_box_side_px() -> f32 {
        DEFAULT_MIN_BOX_SIDE_PX
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binarization: BinarizationMethod::default(),
            polarity: Polarity::default(),
            equalize_histogram: false,
            blur_radius: Self::default_blur_radius(),
            close_radius: Self::default_close_radius(),
            open_radius: Self::default_open_radius(),
            min_region_area_fraction: Self::default_min_region_area_fraction(),
            max_region_area_fraction: Self::default_max_region_area_fraction(),
            rectangularity_threshold: Self::default_rectangularity_threshold(),
            area_tie_tolerance: Self::default_area_tie_tolerance(),
            min_box_side_px: Self::default_min_box_side_px(),
            margin_px: 0,
            margin_fraction: 0.0,
            profile_refinement: None,
            scale_px_per_mm: None,
            output_format: OutputFormat::default(),
        }
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let BinarizationMethod::Adaptive { block_radius, .. } = self.binarization
            && block_radius == 0
        {
            return Err(ConfigError::OutOfRange {
                field: "binarization.block_radius",
                value: block_radius.to_string(),
                expected: "a radius >= 1",
            });
        }

        self.validate_unit_open("min_region_area_fraction", self.min_region_area_fraction)?;
        if !(self.max_region_area_fraction.is_finite()
            && self.max_region_area_fraction > self.min_region_area_fraction
            && self.max_region_area_fraction <= 1.0)
        {
            return Err(ConfigError::OutOfRange {
                field: "max_region_area_fraction",
                value: self.max_region_area_fraction.to_string(),
                expected: "a value in (min_region_area_fraction, 1]",
            });
        }
        self.validate_unit_open("rectangularity_threshold", self.rectangularity_threshold)?;

        if !(self.area_tie_tolerance.is_finite()
            && (0.0..1.0).contains(&self.area_tie_tolerance))
        {
            return Err(ConfigError::OutOfRange {
                field: "area_tie_tolerance",
                value: self.area_tie_tolerance.to_string(),
                expected: "a value in [0, 1)",
            });
        }

        self.validate_positive("min_box_side_px", self.min_box_side_px)?;
        self.validate_non_negative("margin_fraction", self.margin_fraction)?;

        if let Some(refinement) = &self.profile_refinement {
            self.validate_unit_open("profile_refinement.row_ratio", refinement.row_ratio)?;
            self.validate_unit_open("profile_refinement.column_ratio", refinement.column_ratio)?;
        }

        if let Some(scale) = self.scale_px_per_mm {
            self.validate_positive("scale_px_per_mm", scale)?;
        }

        if let OutputFormat::Jpeg { quality } = self.output_format
            && !(1..=100).contains(&quality)
        {
            return Err(ConfigError::OutOfRange {
                field: "output_format.quality",
                value: quality.to_string(),
                expected: "a quality in 1..=100",
            });
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let config = PipelineConfig::new().with_min_region_area_fraction(0.0);
        assert!(config.validate().is_err());

        let config = PipelineConfig::new().with_rectangularity_threshold(1.0);
        assert!(config.validate().is_err());

        let config = PipelineConfig::new().with_scale_px_per_mm(Some(0.0));
        assert!(config.validate().is_err());

        let config = PipelineConfig::new().with_scale_px_per_mm(Some(-3.0));
        assert!(config.validate().is_err());

        let config = PipelineConfig::new().with_binarization(BinarizationMethod::Adaptive {
            block_radius: 0,
            offset: 5,
        });
        assert!(config.validate().is_err());

        let config = PipelineConfig::new().with_output_format(OutputFormat::Jpeg { quality: 0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_fraction_must_exceed_min() {
        let mut config = PipelineConfig::new();
        config.min_region_area_fraction = 0.5;
        config.max_region_area_fraction = 0.4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "binarization": { "method": "adaptive", "block_radius": 15 },
                "margin_px": 12,
                "scale_px_per_mm": 40.0
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.binarization,
            BinarizationMethod::Adaptive {
                block_radius: 15,
                offset: 10
            }
        );
        assert_eq!(config.margin_px, 12);
        assert_eq!(config.scale_px_per_mm, Some(40.0));
        assert_eq!(config.blur_radius, DEFAULT_BLUR_RADIUS);
        assert_eq!(config.output_format, OutputFormat::Png);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_morphology_and_refinement() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "open_radius": 0,
                "profile_refinement": { "selection": "fixed", "row_ratio": 0.9 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.close_radius, DEFAULT_CLOSE_RADIUS);
        assert_eq!(config.open_radius, 0);
        let refinement = config.profile_refinement.unwrap();
        assert_eq!(refinement.selection, ThresholdSelection::Fixed);
        assert_eq!(refinement.row_ratio, 0.9);
        assert_eq!(refinement.column_ratio, 0.80);

        let config: PipelineConfig =
            serde_json::from_str(r#"{ "profile_refinement": {} }"#).unwrap();
        assert_eq!(
            config.profile_refinement,
            Some(ProfileRefinement::default())
        );
        assert_eq!(
            ProfileRefinement::default().selection,
            ThresholdSelection::ByPackage
        );
    }

    #[test]
    fn test_json_fixed_threshold_level() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "binarization": { "method": "fixed_threshold", "level": 90 } }"#)
                .unwrap();
        assert_eq!(
            config.binarization,
            BinarizationMethod::FixedThreshold { level: Some(90) }
        );
    }
}
