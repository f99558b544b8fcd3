//! Model specification, resolution and metadata loading
//!
//! Models live in a HuggingFace-layout directory: `config.json`,
//! `preprocessor_config.json` and `onnx/model.onnx`. They are resolved either
//! from the download cache by id or from an explicit filesystem path.

use crate::cache::ModelCache;
use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Model source specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSource {
    /// Downloaded model from cache by model id
    Cached(String),
    /// External model from a filesystem path
    External(PathBuf),
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Cached(model_id) => format!("cached:{model_id}"),
            Self::External(path) => format!(
                "external:{}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
        }
    }
}

/// Complete model specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub source: ModelSource,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            source: ModelSource::Cached(ModelCache::default_model_id().to_string()),
        }
    }
}

/// Preprocessing configuration read from `preprocessor_config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Model input size as [height, width]
    pub target_size: [u32; 2],
    /// Per-channel normalization mean (0-1 range)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization std (0-1 range)
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: [1024, 1024],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Model information and metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Loads model data and metadata from a resolved model directory
#[derive(Debug, Clone)]
pub struct ModelManager {
    model_dir: PathBuf,
    name: String,
    preprocessing: PreprocessingConfig,
}

impl ModelManager {
    /// Resolve a model specification against the cache or the filesystem
    ///
    /// # Errors
    /// - Cached model id not present in the cache
    /// - External model path missing or not a directory
    /// - Invalid or missing model configuration files
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        match &spec.source {
            ModelSource::Cached(model_id) => {
                let cache = ModelCache::new()?;
                if !cache.is_model_cached(model_id) {
                    return Err(CutoutError::model(format!(
                        "Model '{model_id}' is not cached at {}",
                        cache.get_model_path(model_id).display()
                    )));
                }
                Self::from_directory(cache.get_model_path(model_id))
            },
            ModelSource::External(path) => Self::from_directory(path),
        }
    }

    /// Load model metadata from a HuggingFace-layout directory
    ///
    /// # Errors
    /// - Directory missing or not a directory
    /// - Missing or unparseable `preprocessor_config.json`
    pub fn from_directory<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref().to_path_buf();

        if !model_dir.is_dir() {
            return Err(CutoutError::invalid_config(format!(
                "Model path is not a directory: {}",
                model_dir.display()
            )));
        }

        let preprocessor_path = model_dir.join("preprocessor_config.json");
        let preprocessor_content = fs::read_to_string(&preprocessor_path).map_err(|e| {
            CutoutError::file_io_error("read preprocessor_config.json", &preprocessor_path, &e)
        })?;
        let preprocessor: serde_json::Value = serde_json::from_str(&preprocessor_content)
            .map_err(|e| {
                CutoutError::invalid_config(format!("Failed to parse preprocessor_config.json: {e}"))
            })?;

        let preprocessing = PreprocessingConfig {
            target_size: Self::parse_target_size(&preprocessor)?,
            normalization_mean: Self::parse_normalization(&preprocessor, "image_mean")?,
            normalization_std: Self::parse_normalization(&preprocessor, "image_std")?,
        };

        let name = Self::read_model_name(&model_dir);

        Ok(Self {
            model_dir,
            name,
            preprocessing,
        })
    }

    /// Path to the ONNX graph inside the model directory
    #[must_use]
    pub fn model_file_path(&self) -> PathBuf {
        self.model_dir.join("onnx").join("model.onnx")
    }

    /// Load the raw ONNX model data
    ///
    /// # Errors
    /// - Model file missing from the directory
    /// - File I/O errors when reading model data
    pub fn load_model_data(&self) -> Result<Vec<u8>> {
        let model_path = self.model_file_path();
        if !model_path.exists() {
            return Err(CutoutError::model(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        fs::read(&model_path)
            .map_err(|e| CutoutError::file_io_error("read model file", &model_path, &e))
    }

    /// Get model information
    ///
    /// # Errors
    /// - Model file missing or unreadable
    pub fn info(&self) -> Result<ModelInfo> {
        let metadata = fs::metadata(self.model_file_path()).map_err(|e| {
            CutoutError::file_io_error("stat model file", self.model_file_path(), &e)
        })?;

        Ok(ModelInfo {
            name: self.name.clone(),
            size_bytes: metadata.len(),
        })
    }

    /// Preprocessing configuration for this model
    #[must_use]
    pub fn preprocessing_config(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    /// Model name from `config.json`, falling back to the directory name
    fn read_model_name(model_dir: &Path) -> String {
        let fallback = || {
            model_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        };

        let config_path = model_dir.join("config.json");
        let Ok(content) = fs::read_to_string(config_path) else {
            return fallback();
        };
        let Ok(config) = serde_json::from_str::<serde_json::Value>(&content) else {
            return fallback();
        };

        config
            .get("model_type")
            .and_then(serde_json::Value::as_str)
            .map_or_else(fallback, ToString::to_string)
    }

    /// Parse the model input size from `preprocessor_config.json`
    fn parse_target_size(preprocessor: &serde_json::Value) -> Result<[u32; 2]> {
        let size = preprocessor
            .get("size")
            .ok_or_else(|| CutoutError::invalid_config("Missing size in preprocessor config"))?;

        let height = size
            .get("height")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CutoutError::invalid_config("Missing height in size config"))?;
        let width = size
            .get("width")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CutoutError::invalid_config("Missing width in size config"))?;

        let height = u32::try_from(height)
            .map_err(|_| CutoutError::invalid_config("Height too large for u32"))?;
        let width = u32::try_from(width)
            .map_err(|_| CutoutError::invalid_config("Width too large for u32"))?;

        Ok([height, width])
    }

    /// Parse `image_mean` or `image_std` into 0-1 range values
    ///
    /// Published preprocessor configs carry these either in 0-1 or 0-255
    /// range; values above 1.0 are rescaled.
    fn parse_normalization(preprocessor: &serde_json::Value, key: &str) -> Result<[f32; 3]> {
        let values = preprocessor
            .get(key)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                CutoutError::invalid_config(format!("Missing {key} in preprocessor config"))
            })?;

        if values.len() < 3 {
            return Err(CutoutError::invalid_config(format!(
                "{key} must have at least 3 values"
            )));
        }

        let mut out = [0.0f32; 3];
        for (slot, value) in out.iter_mut().zip(values.iter()) {
            *slot = value
                .as_f64()
                .ok_or_else(|| CutoutError::invalid_config(format!("Invalid {key} value")))?
                as f32;
        }

        if out.iter().any(|v| *v > 1.0) {
            for v in &mut out {
                *v /= 255.0;
            }
        }

        Ok(out)
    }
}
