//! Image preprocessing for model inference
//!
//! Segmentation models take a fixed-size square input. Images are resized
//! with their aspect ratio preserved, centered on a padded canvas, and
//! normalized into an NCHW float tensor.

use crate::error::{CutoutError, Result};
use crate::models::PreprocessingConfig;
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// White padding for the unused canvas area
const PADDING_COLOR: [u8; 3] = [255, 255, 255];

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image into a normalized `1x3xSxS` tensor
    ///
    /// # Errors
    /// Returns `CutoutError::Processing` for degenerate target sizes or
    /// dimension overflow.
    pub fn to_tensor(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let target_size = preprocessing_config.target_size[0];
        if target_size == 0 {
            return Err(CutoutError::processing("Model target size is zero"));
        }

        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(CutoutError::processing("Input image has zero dimensions"));
        }

        let (_, new_width, new_height) =
            Self::scaled_dimensions(target_size, orig_width, orig_height);

        let resized = image::imageops::resize(
            &rgb_image,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );

        // Center the resized image on a padded square canvas
        let mut canvas = ImageBuffer::from_pixel(
            target_size,
            target_size,
            image::Rgb(PADDING_COLOR),
        );
        let offset_x = (target_size - new_width) / 2;
        let offset_y = (target_size - new_height) / 2;
        for (x, y, pixel) in resized.enumerate_pixels() {
            let canvas_x = x + offset_x;
            let canvas_y = y + offset_y;
            if canvas_x < target_size && canvas_y < target_size {
                canvas.put_pixel(canvas_x, canvas_y, *pixel);
            }
        }

        let side = target_size.try_into().map_err(|_| {
            CutoutError::processing("Target size too large for tensor allocation")
        })?;
        Ok(Self::canvas_to_tensor(&canvas, preprocessing_config, side))
    }

    /// Scale factor and resized dimensions used to fit an image into the
    /// model's square input while preserving aspect ratio
    #[must_use]
    pub fn scaled_dimensions(target_size: u32, orig_width: u32, orig_height: u32) -> (f32, u32, u32) {
        let target = target_size as f32;
        let scale = target.min((target / orig_width as f32).min(target / orig_height as f32));

        let new_width = ((orig_width as f32 * scale).round() as u32).min(target_size);
        let new_height = ((orig_height as f32 * scale).round() as u32).min(target_size);

        (scale, new_width.max(1), new_height.max(1))
    }

    /// Convert the padded canvas into a normalized NCHW tensor
    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
        side: usize,
    ) -> Array4<f32> {
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

        #[allow(clippy::indexing_slicing)] // tensor pre-allocated to canvas size
        for (y, row) in canvas.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for channel in 0..3 {
                    let normalized =
                        (f32::from(pixel[channel]) / 255.0 - mean[channel]) / std[channel];
                    tensor[[0, channel, y, x]] = normalized;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [size, size],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [0.5, 0.5, 0.5],
        }
    }

    #[test]
    fn test_tensor_shape_matches_target_size() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(100, 50, Rgb([255, 0, 0])));
        let tensor = ImagePreprocessor::to_tensor(&image, &test_config(64)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    }

    #[test]
    fn test_normalization_applied() {
        // A white image with mean 0.5 / std 0.5 normalizes to 1.0 everywhere,
        // and the white padding does too.
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 20, Rgb([255, 255, 255])));
        let tensor = ImagePreprocessor::to_tensor(&image, &test_config(32)).unwrap();
        for value in &tensor {
            assert!((value - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_aspect_ratio_preserved_with_centered_padding() {
        // A black 100x50 image on a 64 canvas occupies rows 16..48 after
        // centering; padding rows normalize to +1.0, image rows to -1.0.
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(100, 50, Rgb([0, 0, 0])));
        let tensor = ImagePreprocessor::to_tensor(&image, &test_config(64)).unwrap();

        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6); // top padding
        assert!((tensor[[0, 0, 63, 0]] - 1.0).abs() < 1e-6); // bottom padding
        assert!((tensor[[0, 0, 32, 32]] + 1.0).abs() < 1e-6); // image center
    }

    #[test]
    fn test_scaled_dimensions_landscape_and_portrait() {
        let (_, w, h) = ImagePreprocessor::scaled_dimensions(64, 100, 50);
        assert_eq!((w, h), (64, 32));

        let (_, w, h) = ImagePreprocessor::scaled_dimensions(64, 50, 100);
        assert_eq!((w, h), (32, 64));
    }

    #[test]
    fn test_zero_sized_input_rejected() {
        let image = DynamicImage::new_rgb8(0, 0);
        assert!(ImagePreprocessor::to_tensor(&image, &test_config(32)).is_err());
    }
}
