//! Core types for CredVault.

mod credential;
mod kind;
mod network;

pub use credential::*;
pub use kind::*;
pub use network::*;
