//! Error types for store operations.

use credvault_core::{ConfigError, CredentialType};
use std::fmt;
use thiserror::Error;

/// Native call that produced a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeCall {
    Write,
    Read,
    Delete,
    Enumerate,
    ParseUserName,
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Write => "write",
            Self::Read => "read",
            Self::Delete => "delete",
            Self::Enumerate => "enumerate",
            Self::ParseUserName => "parse_user_name",
        })
    }
}

/// Classified native status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Success,
    NotFound,
    InvalidAccountName,
    InsufficientBuffer,
    InvalidParameter,
    Cancelled,
    /// Any code without a dedicated variant.
    Generic(u32),
}

impl NativeStatus {
    /// Classify a raw platform error code.
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Success,
            1168 => Self::NotFound,
            1315 => Self::InvalidAccountName,
            122 => Self::InsufficientBuffer,
            87 => Self::InvalidParameter,
            1223 => Self::Cancelled,
            other => Self::Generic(other),
        }
    }

    /// Raw platform error code.
    pub const fn code(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::NotFound => 1168,
            Self::InvalidAccountName => 1315,
            Self::InsufficientBuffer => 122,
            Self::InvalidParameter => 87,
            Self::Cancelled => 1223,
            Self::Generic(code) => code,
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::NotFound => f.write_str("element not found (1168)"),
            Self::InvalidAccountName => f.write_str("invalid account name (1315)"),
            Self::InsufficientBuffer => f.write_str("insufficient buffer (122)"),
            Self::InvalidParameter => f.write_str("invalid parameter (87)"),
            Self::Cancelled => f.write_str("cancelled (1223)"),
            Self::Generic(code) => write!(f, "error code {code}"),
        }
    }
}

/// Input rejected before any native call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds the limit of {limit}")]
    TooLong { field: String, limit: usize },

    #[error("{field} contains an embedded NUL character")]
    InteriorNul { field: String },

    #[error("{count} attributes exceed the limit of {limit}")]
    TooManyAttributes { count: usize, limit: usize },

    #[error("attribute key '{key}' exceeds the limit of {limit} bytes")]
    AttributeKeyTooLong { key: String, limit: usize },

    #[error("attribute '{key}' has a null value")]
    NullAttribute { key: String },

    #[error("attribute '{key}' cannot be serialized: {reason}")]
    Unserializable { key: String, reason: String },

    #[error("{field} is required for {credential_type} credentials")]
    Required {
        field: &'static str,
        credential_type: CredentialType,
    },
}

impl ValidationError {
    /// Name of the offending field. For attribute values this is the key.
    pub fn field(&self) -> &str {
        match self {
            Self::Empty { field } | Self::Required { field, .. } => field,
            Self::TooLong { field, .. } | Self::InteriorNul { field } => field,
            Self::TooManyAttributes { .. } => "attributes",
            Self::AttributeKeyTooLong { .. } => "attribute_key",
            Self::NullAttribute { key } | Self::Unserializable { key, .. } => key,
        }
    }

    /// The ceiling that was exceeded, when the error is about size.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::TooLong { limit, .. }
            | Self::TooManyAttributes { limit, .. }
            | Self::AttributeKeyTooLong { limit, .. } => Some(*limit),
            _ => None,
        }
    }
}

/// An attribute that could not be recovered while decoding.
///
/// Logged and skipped; never fails the enclosing read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute '{key}' could not be decoded: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("attribute #{index} is unreadable: {reason}")]
    Unreadable { index: usize, reason: &'static str },
}

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Native {api} failed: {status}")]
    Api { api: NativeCall, status: NativeStatus },

    #[error("Invalid handle state: {0}")]
    InvalidState(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Native store unavailable: {0}")]
    Unsupported(String),
}

impl CredentialError {
    /// Build an API error from a native status.
    pub fn api(api: NativeCall, status: NativeStatus) -> Self {
        Self::Api { api, status }
    }

    /// Native status carried by an API error.
    pub fn status(&self) -> Option<NativeStatus> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is the store reporting a missing target.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(NativeStatus::NotFound)
    }
}

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(NativeStatus::from_code(0), NativeStatus::Success);
        assert_eq!(NativeStatus::from_code(1168), NativeStatus::NotFound);
        assert_eq!(NativeStatus::from_code(1315), NativeStatus::InvalidAccountName);
        assert_eq!(NativeStatus::from_code(122), NativeStatus::InsufficientBuffer);
        assert_eq!(NativeStatus::from_code(87), NativeStatus::InvalidParameter);
        assert_eq!(NativeStatus::from_code(1223), NativeStatus::Cancelled);
        assert_eq!(NativeStatus::from_code(5), NativeStatus::Generic(5));
    }

    #[test]
    fn test_status_code_is_inverse() {
        for code in [0, 1168, 1315, 122, 87, 1223, 1312, 1004] {
            assert_eq!(NativeStatus::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_api_error_display() {
        let err = CredentialError::api(NativeCall::Delete, NativeStatus::NotFound);
        assert_eq!(err.to_string(), "Native delete failed: element not found (1168)");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validation_field_and_limit() {
        let err = ValidationError::TooLong {
            field: "comment".to_string(),
            limit: 256,
        };
        assert_eq!(err.field(), "comment");
        assert_eq!(err.limit(), Some(256));

        let err = ValidationError::NullAttribute {
            key: "role".to_string(),
        };
        assert_eq!(err.field(), "role");
        assert_eq!(err.limit(), None);
    }
}
