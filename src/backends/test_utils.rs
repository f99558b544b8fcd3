//! Mock backend for testing the pipeline without model files

use crate::error::{CutoutError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, PreprocessingConfig};
use ndarray::Array4;

/// Mock segmentation backend producing a constant foreground probability
#[derive(Debug, Clone)]
pub struct MockBackend {
    initialized: bool,
    preprocessing_config: PreprocessingConfig,
    mask_value: f32,
    fail_inference: bool,
}

impl MockBackend {
    /// Mock backend classifying every pixel as foreground
    #[must_use]
    pub fn new() -> Self {
        Self::with_mask_value(1.0)
    }

    /// Mock backend producing a uniform probability map
    #[must_use]
    pub fn with_mask_value(mask_value: f32) -> Self {
        Self {
            initialized: false,
            preprocessing_config: PreprocessingConfig {
                target_size: [32, 32],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            },
            mask_value,
            fail_inference: false,
        }
    }

    /// Mock backend whose inference always fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_inference: true,
            ..Self::new()
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(CutoutError::inference("Mock backend not initialized"));
        }
        if self.fail_inference {
            return Err(CutoutError::inference("Simulated inference failure"));
        }

        let shape = input.shape();
        let (height, width) = (shape[2], shape[3]);
        Ok(Array4::from_elem((1, 1, height, width), self.mask_value))
    }

    fn preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.preprocessing_config.clone())
    }

    fn model_info(&self) -> Result<ModelInfo> {
        Ok(ModelInfo {
            name: "mock".to_string(),
            size_bytes: 0,
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
