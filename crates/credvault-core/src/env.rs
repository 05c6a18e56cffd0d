//! Environment variable handling.

use std::env;

/// Well-known environment variable names.
pub mod vars {
    /// Overrides the configuration file location.
    pub const CONFIG: &str = "CREDVAULT_CONFIG";
    /// Forces the in-memory store even on hosts with a native store.
    pub const MEMORY_STORE: &str = "CREDVAULT_MEMORY_STORE";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
