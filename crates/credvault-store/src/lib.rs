//! Boundary layer between CredVault and the platform credential store.
//!
//! Converts owned [`Credential`](credvault_core::Credential) values to and
//! from native records, calls the native API through the [`NativeApi`]
//! seam, and guarantees that every native buffer is zeroed and freed
//! exactly once.

pub mod account;
pub mod attributes;
pub mod decode;
pub mod encode;
pub mod error;
pub mod handle;
pub mod native;
pub mod store;

pub use account::{parse_account_name, split_account_name};
pub use attributes::{AttributeCodec, AttributeFormat};
pub use encode::{EncodeLimits, EncodedCredential};
pub use error::{
    AttributeError, CredentialError, NativeCall, NativeStatus, Result, ValidationError,
};
pub use handle::CredentialHandle;
pub use native::{MemoryApi, MemoryStats, NativeApi};
pub use store::CredentialStore;
