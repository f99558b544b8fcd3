//! Configuration types for background removal operations

use crate::models::{ModelSource, ModelSpec};
use serde::{Deserialize, Serialize};

/// Configuration for background removal operations
///
/// The output is always a PNG with an alpha channel; the only tunable is
/// which segmentation model runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RemovalConfig {
    /// Model specification (cached id or external path)
    pub model_spec: ModelSpec,
}

impl RemovalConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::new()
    }

    /// Validate configuration invariants
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` for an empty cached model id.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let ModelSource::Cached(model_id) = &self.model_spec.source {
            if model_id.is_empty() {
                return Err(crate::error::CutoutError::invalid_config(
                    "Cached model id must not be empty",
                ));
            }
        }
        Ok(())
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model_spec(mut self, model_spec: ModelSpec) -> Self {
        self.config.model_spec = model_spec;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` when validation fails.
    pub fn build(self) -> crate::error::Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ModelCache;

    #[test]
    fn test_default_config_uses_default_model() {
        let config = RemovalConfig::default();
        assert_eq!(
            config.model_spec.source,
            ModelSource::Cached(ModelCache::default_model_id().to_string())
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_empty_model_id() {
        let result = RemovalConfig::builder()
            .model_spec(ModelSpec {
                source: ModelSource::Cached(String::new()),
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_accepts_external_model() {
        let config = RemovalConfig::builder()
            .model_spec(ModelSpec {
                source: ModelSource::External("/models/isnet".into()),
            })
            .build()
            .unwrap();
        assert_eq!(config.model_spec.source.display_name(), "external:isnet");
    }
}
