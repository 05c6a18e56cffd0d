//! Configuration schema definitions.

use crate::types::{
    CredentialType, Persistence, MAX_ATTRIBUTE_VALUE_BYTES, MAX_BLOB_BYTES,
};
use serde::{Deserialize, Serialize};

/// Main CredVault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store behaviour and size ceilings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Ceiling for the encoded secret, in UTF-16 bytes.
    #[serde(default = "default_max_blob_bytes")]
    pub max_blob_bytes: usize,

    /// Ceiling for one serialized attribute value, in bytes.
    #[serde(default = "default_max_attribute_value_bytes")]
    pub max_attribute_value_bytes: usize,

    /// Try older attribute encodings when the current one fails to parse.
    #[serde(default = "default_true")]
    pub legacy_attribute_fallback: bool,

    /// Reject writes whose secret is missing or empty.
    #[serde(default)]
    pub require_secret: bool,

    /// Type used by commands that do not name one.
    #[serde(default)]
    pub default_type: CredentialType,

    /// Persistence used by commands that do not name one.
    #[serde(default)]
    pub default_persistence: Persistence,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: default_max_blob_bytes(),
            max_attribute_value_bytes: default_max_attribute_value_bytes(),
            legacy_attribute_fallback: true,
            require_secret: false,
            default_type: CredentialType::default(),
            default_persistence: Persistence::default(),
        }
    }
}

fn default_max_blob_bytes() -> usize {
    MAX_BLOB_BYTES
}

fn default_max_attribute_value_bytes() -> usize {
    MAX_ATTRIBUTE_VALUE_BYTES
}

fn default_true() -> bool {
    true
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "credvault=info".to_string()
}
