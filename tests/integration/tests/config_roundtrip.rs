//! Config save/load roundtrip integration tests.
//!
//! These verify that configuration can be serialized, written to disk, and
//! loaded back with identical field values, and that a loaded config shapes
//! the store built from it.

use credvault_core::config::{Config, ConfigBuilder};
use credvault_core::{Credential, CredentialType, Persistence};
use credvault_integration_tests::memory_store_with;
use credvault_store::CredentialError;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credvault.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.store.max_blob_bytes, config.store.max_blob_bytes);
    assert_eq!(
        loaded.store.max_attribute_value_bytes,
        config.store.max_attribute_value_bytes
    );
    assert_eq!(loaded.store.default_persistence, config.store.default_persistence);
    assert_eq!(loaded.logging.filter, config.logging.filter);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credvault.json5");

    let config = ConfigBuilder::new()
        .max_blob_bytes(512)
        .default_type(CredentialType::Certificate)
        .default_persistence(Persistence::Session)
        .build();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.store.max_blob_bytes, 512);
    assert_eq!(loaded.store.default_type, CredentialType::Certificate);
    assert_eq!(loaded.store.default_persistence, Persistence::Session);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/credvault.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}

#[test]
fn test_loaded_config_drives_store_policy() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credvault.json5");
    std::fs::write(
        &path,
        r#"{
            store: {
                require_secret: true,
                max_attribute_value_bytes: 8,
                legacy_attribute_fallback: false,
            },
        }"#,
    )
    .unwrap();

    let config = Config::load_or_default(&path).unwrap();
    let (api, store) = memory_store_with(config.store);

    let err = store
        .write(&Credential::new("t", CredentialType::Generic))
        .unwrap_err();
    assert!(matches!(err, CredentialError::Validation(_)));

    let err = store
        .write(
            &Credential::new("t", CredentialType::Generic)
                .with_secret("s")
                .with_attribute("k", serde_json::json!("0123456789")),
        )
        .unwrap_err();
    match err {
        CredentialError::Validation(e) => assert_eq!(e.limit(), Some(8)),
        other => panic!("expected validation error, got {other:?}"),
    }

    let legacy: Vec<u8> = "old".encode_utf16().flat_map(u16::to_le_bytes).collect();
    store
        .write(&Credential::new("t", CredentialType::Generic).with_secret("s"))
        .unwrap();
    assert!(api.put_raw_attribute("t", CredentialType::Generic, "legacy", legacy));
    let read = store.read("t", CredentialType::Generic).unwrap().unwrap();
    assert!(read.attributes.is_empty());
}
