//! Configuration loading and persistence.

use super::Config;
use crate::error::ConfigError;
use crate::types::{CredentialType, Persistence, MAX_ATTRIBUTE_VALUE_BYTES};
use std::fs;
use std::path::Path;
use tracing::warn;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.store.max_blob_bytes == 0 {
            errors.push("store.max_blob_bytes must be greater than 0".to_string());
        }
        if self.store.max_blob_bytes % 2 != 0 {
            errors.push(format!(
                "store.max_blob_bytes must be even (UTF-16 bytes), got {}",
                self.store.max_blob_bytes
            ));
        }
        if self.store.max_attribute_value_bytes == 0 {
            errors.push("store.max_attribute_value_bytes must be greater than 0".to_string());
        }
        if let CredentialType::Other(code) = self.store.default_type {
            errors.push(format!(
                "store.default_type must be generic, windows or certificate, got code {code}"
            ));
        }
        if self.logging.filter.trim().is_empty() {
            errors.push("logging.filter must not be empty".to_string());
        }

        if self.store.max_attribute_value_bytes > MAX_ATTRIBUTE_VALUE_BYTES {
            warn!(
                limit = self.store.max_attribute_value_bytes,
                "attribute value ceiling raised above the {MAX_ATTRIBUTE_VALUE_BYTES}-byte default"
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the secret blob ceiling.
    pub fn max_blob_bytes(mut self, bytes: usize) -> Self {
        self.config.store.max_blob_bytes = bytes;
        self
    }

    /// Set the attribute value ceiling.
    pub fn max_attribute_value_bytes(mut self, bytes: usize) -> Self {
        self.config.store.max_attribute_value_bytes = bytes;
        self
    }

    /// Enable or disable the legacy attribute decoders.
    pub fn legacy_attribute_fallback(mut self, enabled: bool) -> Self {
        self.config.store.legacy_attribute_fallback = enabled;
        self
    }

    /// Require a non-empty secret on write.
    pub fn require_secret(mut self, required: bool) -> Self {
        self.config.store.require_secret = required;
        self
    }

    /// Set the default credential type.
    pub fn default_type(mut self, credential_type: CredentialType) -> Self {
        self.config.store.default_type = credential_type;
        self
    }

    /// Set the default persistence.
    pub fn default_persistence(mut self, persistence: Persistence) -> Self {
        self.config.store.default_persistence = persistence;
        self
    }

    /// Set the log filter.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.logging.filter = filter.into();
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }
}
