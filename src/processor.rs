//! Background removal pipeline
//!
//! `BackgroundRemovalProcessor` owns the backend and runs the linear
//! pipeline: preprocess the decoded image, run segmentation inference, map
//! the probability map back onto the original image's coordinate space, and
//! write it into the alpha channel.

use crate::{
    backends::TractBackend,
    config::RemovalConfig,
    error::{CutoutError, Result},
    inference::InferenceBackend,
    models::ModelManager,
    preprocessing::ImagePreprocessor,
    types::{RemovalResult, SegmentationMask},
};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use std::path::Path;
use std::time::Instant;

/// Parameters for mapping tensor coordinates back to image coordinates
#[derive(Debug, Clone)]
struct CoordinateTransformation {
    /// Scale factor used during preprocessing
    scale: f32,
    /// X offset for centering
    offset_x: u32,
    /// Y offset for centering
    offset_y: u32,
    /// Mask width in tensor coordinates
    mask_width: u32,
    /// Mask height in tensor coordinates
    mask_height: u32,
}

/// Background removal processor
pub struct BackgroundRemovalProcessor {
    config: RemovalConfig,
    backend: Box<dyn InferenceBackend>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor backed by the Tract inference engine
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Model resolution failures (model not cached, missing files)
    pub fn new(config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        let model_manager = ModelManager::from_spec(&config.model_spec)?;
        let backend = Box::new(TractBackend::new(model_manager));
        Ok(Self { config, backend })
    }

    /// Create a processor with an injected backend
    pub fn with_backend(config: RemovalConfig, backend: Box<dyn InferenceBackend>) -> Self {
        Self { config, backend }
    }

    /// Load an image file and remove its background
    ///
    /// # Errors
    /// - File I/O or decode errors
    /// - Inference and postprocessing errors
    pub fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<RemovalResult> {
        let image = crate::io::load_image(input_path)?;
        self.process_image(&image)
    }

    /// Remove the background from a decoded image
    ///
    /// # Errors
    /// - Preprocessing failures
    /// - Inference execution errors
    /// - Mask generation and application errors
    #[tracing::instrument(
        skip(self, image),
        fields(
            model = %self.config.model_spec.source.display_name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        if !self.backend.is_initialized() {
            self.backend.initialize()?;
        }

        let original_dimensions = image.dimensions();

        let preprocess_start = Instant::now();
        let preprocessing_config = self.backend.preprocessing_config()?;
        let input_tensor = ImagePreprocessor::to_tensor(image, &preprocessing_config)?;
        tracing::debug!(
            elapsed_ms = preprocess_start.elapsed().as_millis() as u64,
            "preprocessing done"
        );

        let output_tensor = self.backend.infer(&input_tensor)?;

        let postprocess_start = Instant::now();
        let mask = Self::tensor_to_mask(&output_tensor, original_dimensions)?;

        let mut result_image = image.to_rgba8();
        mask.apply_to_image(&mut result_image)?;
        tracing::debug!(
            elapsed_ms = postprocess_start.elapsed().as_millis() as u64,
            "mask applied"
        );

        Ok(RemovalResult::new(
            DynamicImage::ImageRgba8(result_image),
            mask,
            original_dimensions,
        ))
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Convert the output tensor to a mask in original image coordinates
    fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        Self::validate_tensor_shape(tensor)?;
        let transformation = Self::inverse_transformation(tensor, original_dimensions);
        let mask_data = Self::extract_mask_values(tensor, original_dimensions, &transformation);
        Ok(SegmentationMask::new(mask_data, original_dimensions))
    }

    /// The mask tensor must be a single-channel batch of one
    fn validate_tensor_shape(tensor: &Array4<f32>) -> Result<()> {
        let shape = tensor.shape();
        if shape.first().copied().unwrap_or(0) != 1 || shape.get(1).copied().unwrap_or(0) != 1 {
            return Err(CutoutError::processing(format!(
                "Invalid output tensor shape: {shape:?}"
            )));
        }
        Ok(())
    }

    /// Reproduce the preprocessing geometry to invert it
    fn inverse_transformation(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> CoordinateTransformation {
        let shape = tensor.shape();
        let mask_height = shape.get(2).copied().unwrap_or(0) as u32;
        let mask_width = shape.get(3).copied().unwrap_or(0) as u32;
        let (orig_width, orig_height) = original_dimensions;

        let (scale, scaled_width, scaled_height) =
            ImagePreprocessor::scaled_dimensions(mask_width, orig_width, orig_height);

        CoordinateTransformation {
            scale,
            offset_x: (mask_width - scaled_width) / 2,
            offset_y: (mask_height.max(scaled_height) - scaled_height) / 2,
            mask_width,
            mask_height,
        }
    }

    /// Sample the tensor at the mapped position of every original pixel
    fn extract_mask_values(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
        transformation: &CoordinateTransformation,
    ) -> Vec<u8> {
        let (orig_width, orig_height) = original_dimensions;
        let mut mask_data = Vec::with_capacity((orig_width as usize) * (orig_height as usize));

        for y in 0..orig_height {
            for x in 0..orig_width {
                let value = Self::tensor_value_at(tensor, x, y, transformation);
                mask_data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        mask_data
    }

    /// Tensor value at the mapped coordinate, zero outside the prediction area
    fn tensor_value_at(
        tensor: &Array4<f32>,
        x: u32,
        y: u32,
        transformation: &CoordinateTransformation,
    ) -> f32 {
        let tensor_x = (x as f32 * transformation.scale).round() as u32 + transformation.offset_x;
        let tensor_y = (y as f32 * transformation.scale).round() as u32 + transformation.offset_y;

        if tensor_x < transformation.mask_width && tensor_y < transformation.mask_height {
            tensor
                .get([0, 0, tensor_y as usize, tensor_x as usize])
                .copied()
                .unwrap_or(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use image::{ImageBuffer, Rgb};

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 100, 50])))
    }

    fn processor_with(backend: MockBackend) -> BackgroundRemovalProcessor {
        BackgroundRemovalProcessor::with_backend(RemovalConfig::default(), Box::new(backend))
    }

    #[test]
    fn test_full_foreground_keeps_every_pixel_opaque() {
        let mut processor = processor_with(MockBackend::with_mask_value(1.0));
        let result = processor.process_image(&test_image(48, 24)).unwrap();

        assert_eq!(result.dimensions(), (48, 24));
        let rgba = result.image.to_rgba8();
        for pixel in rgba.pixels() {
            assert_eq!(pixel.0, [200, 100, 50, 255]);
        }
    }

    #[test]
    fn test_full_background_makes_every_pixel_transparent() {
        let mut processor = processor_with(MockBackend::with_mask_value(0.0));
        let result = processor.process_image(&test_image(16, 16)).unwrap();

        let rgba = result.image.to_rgba8();
        for pixel in rgba.pixels() {
            assert_eq!(pixel[3], 0);
        }
    }

    #[test]
    fn test_mask_matches_original_dimensions_for_non_square_input() {
        let mut processor = processor_with(MockBackend::new());
        let result = processor.process_image(&test_image(100, 30)).unwrap();

        assert_eq!(result.mask.dimensions, (100, 30));
        assert_eq!(result.mask.data.len(), 100 * 30);
        assert_eq!(result.original_dimensions, (100, 30));
    }

    #[test]
    fn test_inference_failure_propagates() {
        let mut processor = processor_with(MockBackend::failing());
        let err = processor.process_image(&test_image(8, 8)).unwrap_err();
        assert!(matches!(err, CutoutError::Inference(_)));
    }

    #[test]
    fn test_tensor_to_mask_rejects_multi_channel_output() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(BackgroundRemovalProcessor::tensor_to_mask(&tensor, (4, 4)).is_err());
    }

    #[test]
    fn test_tensor_to_mask_inverts_centering_offsets() {
        // Original 4x2 image on an 8x8 tensor: scale 2, scaled size 8x4,
        // vertical offset 2. Mark only the image's area as foreground.
        let mut tensor = Array4::<f32>::zeros((1, 1, 8, 8));
        for y in 2..6 {
            for x in 0..8 {
                tensor[[0, 0, y, x]] = 1.0;
            }
        }

        let mask = BackgroundRemovalProcessor::tensor_to_mask(&tensor, (4, 2)).unwrap();
        assert_eq!(mask.dimensions, (4, 2));
        assert!(mask.data.iter().all(|v| *v == 255));
    }

    #[test]
    fn test_tensor_to_mask_splits_left_and_right_halves() {
        // Foreground only in the left half of the tensor.
        let mut tensor = Array4::<f32>::zeros((1, 1, 8, 8));
        for y in 0..8 {
            for x in 0..4 {
                tensor[[0, 0, y, x]] = 1.0;
            }
        }

        let mask = BackgroundRemovalProcessor::tensor_to_mask(&tensor, (8, 8)).unwrap();
        let row: Vec<u8> = mask.data.iter().take(8).copied().collect();
        assert_eq!(&row[..4], &[255, 255, 255, 255]);
        assert_eq!(&row[4..], &[0, 0, 0, 0]);
    }
}
