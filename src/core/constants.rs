//! Constants used throughout the crop pipeline.
//!
//! Default values for the tunable detection thresholds live here so the
//! configuration types, the CLI and the tests agree on them.

/// The default Gaussian blur radius in pixels (a 5x5 kernel).
pub const DEFAULT_BLUR_RADIUS: u32 = 2;

/// The default radius of the square closing kernel.
///
/// Three passes of a 5x5 closing reach about as far as one 13x13 closing,
/// which bridges engraved markings and glare on the package top.
pub const DEFAULT_CLOSE_RADIUS: u8 = 6;

/// The default radius of the square opening kernel.
///
/// Removes specks and lead shadows narrower than 9 px.
pub const DEFAULT_OPEN_RADIUS: u8 = 4;

/// The default lower bound on a region's share of the frame area.
///
/// Contours below this are treated as sensor noise or dust.
pub const DEFAULT_MIN_REGION_AREA_FRACTION: f32 = 0.01;

/// The default upper bound on a region's share of the frame area.
///
/// A contour this large is the tray or the frame border, not a chip.
pub const DEFAULT_MAX_REGION_AREA_FRACTION: f32 = 0.9;

/// The default minimum extent ratio (contour area over box area).
///
/// A body with a row of wide leads on each long side scores around 0.75,
/// while L-shaped shadows and overlapping parts stay well below 0.5.
pub const DEFAULT_RECTANGULARITY_THRESHOLD: f32 = 0.7;

/// The default relative area difference treated as a tie between candidates.
pub const DEFAULT_AREA_TIE_TOLERANCE: f32 = 0.01;

/// The default minimum side of an accepted chip box, in pixels.
pub const DEFAULT_MIN_BOX_SIDE_PX: f32 = 10.0;

/// The default JPEG quality for encoded crops.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// The default threshold for parallel batch processing.
///
/// Batches with at most this many files run sequentially.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// File extensions the batch runner picks up, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// The default name of the batch summary file.
pub const DEFAULT_SUMMARY_FILE_NAME: &str = "ic_dimensions.csv";
