//! Tract backend for segmentation models
//!
//! Runs ONNX segmentation models through Tract, a pure Rust inference
//! library. No external runtime is required, which keeps the binary a
//! self-contained subprocess.

use crate::error::{CutoutError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager, PreprocessingConfig};
use ndarray::Array4;
use std::time::Instant;
use tract_onnx::prelude::*;

/// Type alias for the runnable Tract model
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend for running segmentation models with pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model: Option<TractModel>,
    model_manager: ModelManager,
}

impl TractBackend {
    /// Create an uninitialized backend for the given model
    #[must_use]
    pub fn new(model_manager: ModelManager) -> Self {
        Self {
            model: None,
            model_manager,
        }
    }

    /// Load the ONNX graph and compile it into a runnable model
    fn load_model(&mut self) -> Result<()> {
        let load_start = Instant::now();
        let model_data = self.model_manager.load_model_data()?;
        let model_info = self.model_manager.info()?;

        tracing::debug!(
            model = %model_info.name,
            size_bytes = model_info.size_bytes,
            "loading segmentation model"
        );

        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| CutoutError::model(format!("Failed to load ONNX model: {e}")))?
            .into_optimized()
            .map_err(|e| CutoutError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| CutoutError::model(format!("Failed to create runnable model: {e}")))?;

        self.model = Some(model);

        tracing::debug!(
            elapsed_ms = load_start.elapsed().as_millis() as u64,
            "model ready"
        );
        Ok(())
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }
        self.load_model()
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| CutoutError::inference("Tract model not initialized"))?;

        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());
        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| CutoutError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| CutoutError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_view = output_tensor
            .to_array_view::<f32>()
            .map_err(|e| CutoutError::inference(format!("Failed to convert output tensor: {e}")))?;

        let shape = output_view.shape();
        if shape.len() != 4 {
            return Err(CutoutError::inference(format!(
                "Expected 4D output tensor, got {}D",
                shape.len()
            )));
        }

        let dims = (
            shape.first().copied().unwrap_or(1),
            shape.get(1).copied().unwrap_or(1),
            shape.get(2).copied().unwrap_or(0),
            shape.get(3).copied().unwrap_or(0),
        );
        let output = Array4::from_shape_vec(dims, output_view.to_owned().into_raw_vec_and_offset().0)
            .map_err(|e| CutoutError::inference(format!("Failed to reshape output tensor: {e}")))?;

        tracing::debug!(
            elapsed_ms = inference_start.elapsed().as_millis() as u64,
            output_shape = ?output.shape(),
            "inference complete"
        );

        Ok(output)
    }

    fn preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.model_manager.preprocessing_config().clone())
    }

    fn model_info(&self) -> Result<ModelInfo> {
        self.model_manager.info()
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_model_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("onnx")).unwrap();
        fs::write(dir.path().join("config.json"), r#"{"model_type": "isnet"}"#).unwrap();
        fs::write(
            dir.path().join("preprocessor_config.json"),
            r#"{"size": {"height": 64, "width": 64}, "image_mean": [0.5, 0.5, 0.5], "image_std": [1.0, 1.0, 1.0]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("onnx").join("model.onnx"), b"not an onnx graph").unwrap();
        dir
    }

    #[test]
    fn test_backend_starts_uninitialized() {
        let dir = fake_model_dir();
        let manager = ModelManager::from_directory(dir.path()).unwrap();
        let backend = TractBackend::new(manager);
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_infer_without_initialize_fails() {
        let dir = fake_model_dir();
        let manager = ModelManager::from_directory(dir.path()).unwrap();
        let mut backend = TractBackend::new(manager);

        let input = Array4::<f32>::zeros((1, 3, 64, 64));
        let err = backend.infer(&input).unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[test]
    fn test_initialize_rejects_invalid_model_data() {
        let dir = fake_model_dir();
        let manager = ModelManager::from_directory(dir.path()).unwrap();
        let mut backend = TractBackend::new(manager);

        let err = backend.initialize().unwrap_err();
        assert!(matches!(err, CutoutError::Model(_)));
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_preprocessing_config_available_before_initialize() {
        let dir = fake_model_dir();
        let manager = ModelManager::from_directory(dir.path()).unwrap();
        let backend = TractBackend::new(manager);

        let config = backend.preprocessing_config().unwrap();
        assert_eq!(config.target_size, [64, 64]);
    }
}
