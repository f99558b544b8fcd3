//! Model cache management for downloaded models
//!
//! Downloaded models live in an XDG-compliant cache directory, one
//! subdirectory per model id. The cache is shared across invocations so the
//! model download happens once per machine, not once per image.

use crate::error::{CutoutError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Default segmentation model resolved when no model is specified
const DEFAULT_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";
const DEFAULT_MODEL_ID: &str = "imgly--isnet-general-onnx";

/// Model cache manager
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a cache manager rooted at the default cache directory
    ///
    /// Uses the XDG cache location (`~/.cache/cutout/models/` on Linux), or
    /// the `CUTOUT_CACHE_DIR` override when set.
    ///
    /// # Errors
    /// - Failed to determine the user cache directory
    /// - Failed to create the cache directory
    pub fn new() -> Result<Self> {
        Self::with_cache_dir(Self::default_cache_dir()?)
    }

    /// Create a cache manager rooted at an explicit directory
    ///
    /// # Errors
    /// - Failed to create the cache directory
    pub fn with_cache_dir<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| {
                CutoutError::file_io_error("create cache directory", &cache_dir, &e)
            })?;
        }

        Ok(Self { cache_dir })
    }

    /// Resolve the default cache directory
    fn default_cache_dir() -> Result<PathBuf> {
        if let Ok(cache_override) = std::env::var("CUTOUT_CACHE_DIR") {
            return Ok(PathBuf::from(cache_override).join("models"));
        }

        Ok(dirs::cache_dir()
            .ok_or_else(|| {
                CutoutError::invalid_config(
                    "Failed to determine cache directory. Set CUTOUT_CACHE_DIR.",
                )
            })?
            .join("cutout")
            .join("models"))
    }

    /// Id of the model downloaded when nothing else is configured
    #[must_use]
    pub fn default_model_id() -> &'static str {
        DEFAULT_MODEL_ID
    }

    /// Source URL for the default model
    #[must_use]
    pub fn default_model_url() -> &'static str {
        DEFAULT_MODEL_URL
    }

    /// Generate a model id from a URL
    ///
    /// HuggingFace repository URLs map to filesystem-safe ids
    /// (`https://huggingface.co/imgly/isnet-general-onnx` becomes
    /// `imgly--isnet-general-onnx`); other URLs hash to `url-<digest>`.
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let prefix = "https://huggingface.co/";
        if let Some(repo) = url.strip_prefix(prefix) {
            repo.trim_end_matches('/').replace('/', "--")
        } else {
            let mut hasher = Sha256::new();
            hasher.update(url.as_bytes());
            let digest = format!("{:x}", hasher.finalize());
            format!("url-{}", digest.get(..12).unwrap_or(&digest))
        }
    }

    /// Check whether a model is cached and structurally complete
    #[must_use]
    pub fn is_model_cached(&self, model_id: &str) -> bool {
        Self::validate_model_directory(&self.cache_dir.join(model_id))
    }

    /// Path to a cached model directory (may not exist)
    #[must_use]
    pub fn get_model_path(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(model_id)
    }

    /// Root of the cache
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// A model directory is valid once all required files are in place
    fn validate_model_directory(model_path: &Path) -> bool {
        model_path.join("config.json").exists()
            && model_path.join("preprocessor_config.json").exists()
            && model_path.join("onnx").join("model.onnx").exists()
    }
}
