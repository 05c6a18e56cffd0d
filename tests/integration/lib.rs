//! Shared fixtures for the integration tests.

use credvault_core::config::StoreConfig;
use credvault_core::{Credential, CredentialType, Persistence};
use credvault_store::{CredentialStore, MemoryApi};
use serde_json::json;
use std::sync::Arc;

/// A store over a fresh in-memory backend, plus the backend for inspection.
pub fn memory_store() -> (Arc<MemoryApi>, CredentialStore) {
    memory_store_with(StoreConfig::default())
}

pub fn memory_store_with(config: StoreConfig) -> (Arc<MemoryApi>, CredentialStore) {
    let api = Arc::new(MemoryApi::new());
    let store = CredentialStore::new(api.clone(), config);
    (api, store)
}

/// The `svc:api` credential used across scenarios.
pub fn svc_credential() -> Credential {
    Credential::new("svc:api", CredentialType::Generic)
        .with_user_name("alice")
        .with_secret("p@ss")
        .with_comment("test")
        .with_persistence(Persistence::LocalMachine)
        .with_attribute("n", json!(1))
}

/// Clear the store-assigned timestamp so records compare by content.
pub fn without_timestamp(mut credential: Credential) -> Credential {
    credential.last_written = None;
    credential
}

/// Assert every native buffer was wiped and freed exactly once.
pub fn assert_buffers_released(api: &MemoryApi) {
    let stats = api.stats();
    assert_eq!(stats.outstanding(), 0, "outstanding buffers: {stats:?}");
    assert_eq!(stats.unwiped_blobs, 0, "blobs freed unwiped: {stats:?}");
    assert_eq!(stats.invalid_frees, 0, "invalid frees: {stats:?}");
}
