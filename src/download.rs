//! Model downloading from HuggingFace repositories
//!
//! Downloads the model configuration files and the ONNX graph into a
//! temporary directory, then moves the directory into the cache atomically so
//! a concurrent or interrupted run never observes a half-written model.

use crate::cache::ModelCache;
use crate::error::{CutoutError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Files that make up a cached HuggingFace model
const REQUIRED_FILES: &[&str] = &["config.json", "preprocessor_config.json", "onnx/model.onnx"];

/// Model downloader
#[derive(Debug)]
pub struct ModelDownloader {
    client: Client,
    cache: ModelCache,
}

impl ModelDownloader {
    /// Create a downloader against the default cache
    ///
    /// # Errors
    /// - Failed to create the HTTP client
    /// - Failed to initialize the model cache
    pub fn new() -> Result<Self> {
        Self::with_cache(ModelCache::new()?)
    }

    /// Create a downloader against an explicit cache
    ///
    /// # Errors
    /// - Failed to create the HTTP client
    pub fn with_cache(cache: ModelCache) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| CutoutError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, cache })
    }

    /// Download a model repository into the cache and return its model id
    ///
    /// Skips the download entirely when the model is already cached.
    ///
    /// # Errors
    /// - Unsupported (non-HuggingFace) URL
    /// - Network errors during download
    /// - File system errors while writing the cache entry
    pub async fn download_model(&self, url: &str) -> Result<String> {
        if !url.starts_with("https://huggingface.co/") {
            return Err(CutoutError::invalid_config(format!(
                "Unsupported model URL: {url}. Only HuggingFace repositories are supported."
            )));
        }

        let model_id = ModelCache::url_to_model_id(url);
        if self.cache.is_model_cached(&model_id) {
            tracing::debug!(model_id, "model already cached");
            return Ok(model_id);
        }

        tracing::info!(url, model_id, "downloading model");

        let temp_dir = Self::create_temp_download_dir(&model_id)?;
        let final_dir = self.cache.get_model_path(&model_id);

        match self.download_model_files(url, &temp_dir).await {
            Ok(()) => {
                if final_dir.exists() {
                    fs::remove_dir_all(&final_dir).map_err(|e| {
                        CutoutError::file_io_error(
                            "remove existing model directory",
                            &final_dir,
                            &e,
                        )
                    })?;
                }
                fs::rename(&temp_dir, &final_dir).map_err(|e| {
                    CutoutError::file_io_error("move downloaded model to cache", &final_dir, &e)
                })?;

                tracing::info!(model_id, "model download complete");
                Ok(model_id)
            },
            Err(e) => {
                if temp_dir.exists() {
                    if let Err(cleanup_err) = fs::remove_dir_all(&temp_dir) {
                        tracing::warn!("failed to clean up temp directory: {cleanup_err}");
                    }
                }
                Err(e)
            },
        }
    }

    /// Create a fresh temporary directory for an atomic download
    fn create_temp_download_dir(model_id: &str) -> Result<PathBuf> {
        let temp_dir = std::env::temp_dir().join(format!("cutout-download-{model_id}"));

        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).map_err(|e| {
                CutoutError::file_io_error("remove stale temp directory", &temp_dir, &e)
            })?;
        }
        fs::create_dir_all(&temp_dir)
            .map_err(|e| CutoutError::file_io_error("create temp directory", &temp_dir, &e))?;

        Ok(temp_dir)
    }

    /// Download every file of the repository into the staging directory
    async fn download_model_files(&self, base_url: &str, download_dir: &Path) -> Result<()> {
        let raw_base = format!("{}/resolve/main/", base_url.trim_end_matches('/'));

        for file_name in REQUIRED_FILES {
            let file_url = format!("{raw_base}{file_name}");
            let local_path = download_dir.join(file_name);

            if let Some(parent) = local_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    CutoutError::file_io_error("create download subdirectory", parent, &e)
                })?;
            }

            self.download_file(&file_url, &local_path).await?;
        }

        Ok(())
    }

    /// Stream a single file to disk
    async fn download_file(&self, url: &str, local_path: &Path) -> Result<()> {
        tracing::debug!(url, "fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CutoutError::network(format!("Failed to request {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(CutoutError::network(format!(
                "Failed to download {url}: HTTP {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| CutoutError::file_io_error("create download file", local_path, &e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| CutoutError::network(format!("Download interrupted: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| CutoutError::file_io_error("write download file", local_path, &e))?;
        }

        file.flush()
            .await
            .map_err(|e| CutoutError::file_io_error("flush download file", local_path, &e))?;

        Ok(())
    }
}
