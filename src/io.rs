//! Image file input/output
//!
//! File loading distinguishes "file missing" from "file unreadable" so the
//! caller gets a precise diagnostic, and saving creates the output directory
//! tree on demand.

use crate::error::{CutoutError, Result};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;

/// Load an image from a file path
///
/// Tries extension-based format detection first and falls back to
/// content-based detection for files with missing or misleading extensions.
///
/// # Errors
/// - File does not exist
/// - File cannot be decoded by any supported format
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CutoutError::file_io_error(
            "read image file",
            path,
            &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        ));
    }

    let decode_start = Instant::now();
    match image::open(path) {
        Ok(image) => {
            tracing::debug!(
                elapsed_ms = decode_start.elapsed().as_millis() as u64,
                "image decoded"
            );
            Ok(image)
        },
        Err(extension_err) => {
            tracing::debug!(
                path = %path.display(),
                error = %extension_err,
                "extension-based decode failed, trying content detection"
            );

            let data = std::fs::read(path)
                .map_err(|e| CutoutError::file_io_error("read image data", path, &e))?;

            image::load_from_memory(&data).map_err(|content_err| {
                CutoutError::processing(format!(
                    "Failed to decode image '{}': {content_err}",
                    path.display()
                ))
            })
        },
    }
}

/// Save an image as PNG, creating missing parent directories
///
/// The write overwrites any existing file at the destination.
///
/// # Errors
/// - Directory creation failures
/// - PNG encoding or file write failures
pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CutoutError::file_io_error("create output directory", parent, &e))?;
        }
    }

    let encode_start = Instant::now();
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| {
            CutoutError::processing(format!(
                "Failed to save PNG '{}': {e}",
                path.display()
            ))
        })?;

    tracing::debug!(
        elapsed_ms = encode_start.elapsed().as_millis() as u64,
        "PNG written"
    );
    Ok(())
}
