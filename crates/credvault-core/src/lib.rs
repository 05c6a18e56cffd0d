//! # credvault-core
//!
//! Core types, configuration, and utilities for CredVault.
//!
//! This crate provides shared functionality used across all CredVault crates:
//!
//! - **Types**: the [`Credential`] record, its type and persistence codes,
//!   and the [`NetworkCredential`] user/secret/domain view
//! - **Configuration**: Loading, validation, and persistence of config files
//! - **Utilities**: Path resolution, environment handling, and the
//!   zeroize-on-drop [`SecretString`]

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
