//! Inference backend abstraction
//!
//! The segmentation model is an opaque collaborator behind this trait: it
//! takes a normalized NCHW tensor and returns a single-channel probability
//! map. Everything else in the pipeline is backend-agnostic.

use crate::error::Result;
use crate::models::{ModelInfo, PreprocessingConfig};
use ndarray::Array4;

/// Trait for segmentation inference backends
pub trait InferenceBackend {
    /// Initialize the backend, loading the model into memory
    ///
    /// # Errors
    /// - Model loading or validation failures
    fn initialize(&mut self) -> Result<()>;

    /// Run inference on a `1x3xHxW` input tensor, producing a `1x1xHxW`
    /// foreground probability tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Output tensor shape or conversion errors
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Preprocessing configuration the model expects
    ///
    /// # Errors
    /// - Model metadata unavailable
    fn preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Model information for diagnostics
    ///
    /// # Errors
    /// - Model metadata unavailable
    fn model_info(&self) -> Result<ModelInfo>;

    /// Check whether the backend is initialized
    fn is_initialized(&self) -> bool;
}
