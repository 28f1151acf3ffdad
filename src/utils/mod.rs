//! Utility functions for the crop pipeline.
//!
//! This module provides image decoding and encoding, the rotation and crop
//! transforms, and logging setup.

pub mod image;
pub mod transform;

pub use self::image::{decode_frame, encode_image, load_frame};
pub use transform::{CropWindow, crop_window, rotate_and_crop, rotate_image, rotate_mask};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
