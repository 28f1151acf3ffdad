//! Image processing stages of the crop pipeline.
//!
//! # Modules
//!
//! * `geometry` - Points, polygons and the minimum-area rectangle
//! * `binarize` - Grayscale conversion, blur, threshold and morphology
//! * `region` - Foreground mask and external contour extraction
//! * `candidate` - Ranking of contours and selection of the chip body
//! * `orientation` - Normalised oriented box of the selected contour
//! * `profile` - Projection-profile refinement that trims leads

pub mod binarize;
pub mod candidate;
pub mod geometry;
pub mod orientation;
pub mod profile;
pub mod region;

pub use binarize::{binarize, blur_sigma, threshold, to_grayscale};
pub use candidate::CandidateSelector;
pub use geometry::{MinAreaRect, Point, Polygon};
pub use orientation::OrientationSolver;
pub use profile::{classify_package, refine_box};
pub use region::{RegionDetection, RegionDetector};
