#![allow(clippy::uninlined_format_args)]

//! # Cutout
//!
//! Background removal for still images: load an image, run a pre-trained
//! segmentation model over it, and produce the same image with the
//! background made transparent.
//!
//! The crate ships a CLI (`cutout <input_path> <output_path>`) designed to
//! be spawned as a subprocess by an image-processing service, and a library
//! API for in-process use:
//!
//! ```rust,no_run
//! use cutout::{remove_background_from_file, RemovalConfig};
//!
//! # fn example() -> cutout::Result<()> {
//! let config = RemovalConfig::default();
//! let result = remove_background_from_file("input.jpg", &config)?;
//! result.save_png("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! Inference runs on the pure Rust Tract backend; models are fetched once
//! from HuggingFace into a per-user cache and reused across invocations.

pub mod backends;
pub mod cache;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod processor;
pub mod types;

// Public API exports
pub use backends::TractBackend;
pub use cache::ModelCache;
pub use config::{RemovalConfig, RemovalConfigBuilder};
pub use download::ModelDownloader;
pub use error::{CutoutError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelInfo, ModelManager, ModelSource, ModelSpec, PreprocessingConfig};
pub use processor::BackgroundRemovalProcessor;
pub use types::{RemovalResult, SegmentationMask};

/// Remove the background from an image file
///
/// Convenience wrapper that builds a processor for a single invocation. The
/// configured model must already be cached; use [`ModelDownloader`] to fetch
/// it first.
///
/// # Errors
/// - File I/O or decode errors
/// - Model resolution or inference errors
pub fn remove_background_from_file<P: AsRef<std::path::Path>>(
    input_path: P,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_file(input_path)
}

/// Remove the background from raw image bytes
///
/// # Errors
/// - Decode errors for unsupported or corrupt data
/// - Model resolution or inference errors
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| CutoutError::processing(format!("Failed to decode image from bytes: {e}")))?;

    let mut processor = BackgroundRemovalProcessor::new(config.clone())?;
    processor.process_image(&image)
}
