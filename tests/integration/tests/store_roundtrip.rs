//! End-to-end store scenarios over the in-memory backend.
//!
//! These run the full path (validation, encoding, the native ABI, the
//! ownership guard and decoding) and check that every native buffer was
//! wiped and freed afterwards.

use credvault_core::config::StoreConfig;
use credvault_core::{Credential, CredentialType, NetworkCredential, Persistence};
use credvault_integration_tests::{
    assert_buffers_released, memory_store, memory_store_with, svc_credential, without_timestamp,
};
use credvault_store::{CredentialError, NativeCall, NativeStatus, ValidationError};
use serde::Deserialize;
use serde_json::{json, Value};

#[test]
fn test_write_read_round_trip() {
    let (api, store) = memory_store();

    store.write(&svc_credential()).unwrap();
    let read = store
        .read("svc:api", CredentialType::Generic)
        .unwrap()
        .expect("credential should exist");

    assert!(read.last_written.is_some());
    assert_eq!(without_timestamp(read), svc_credential());
    assert_buffers_released(&api);
}

#[test]
fn test_round_trip_typed_attributes() {
    #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
    struct Role {
        role: String,
        level: u8,
    }

    let (_api, store) = memory_store();
    let mut credential = Credential::new("typed", CredentialType::Generic).with_secret("s");
    credential
        .set_attribute(
            "role",
            &Role {
                role: "admin".to_string(),
                level: 3,
            },
        )
        .unwrap();
    credential.set_attribute("tags", &["a", "b"]).unwrap();
    credential.set_attribute("enabled", &true).unwrap();
    store.write(&credential).unwrap();

    let read = store
        .read("typed", CredentialType::Generic)
        .unwrap()
        .unwrap();
    let role: Role = read.attribute("role").unwrap().unwrap();
    assert_eq!(
        role,
        Role {
            role: "admin".to_string(),
            level: 3
        }
    );
    let tags: Vec<String> = read.attribute("tags").unwrap().unwrap();
    assert_eq!(tags, vec!["a", "b"]);
    assert_eq!(read.attributes["enabled"], Value::Bool(true));
    assert!(read.attribute::<u8>("missing").is_none());
}

#[test]
fn test_round_trip_unicode() {
    let (_api, store) = memory_store();
    let credential = Credential::new("ünïcødé:目標", CredentialType::Generic)
        .with_user_name("ユーザー@例え.jp")
        .with_secret("пароль🔑")
        .with_comment("注釈");
    store.write(&credential).unwrap();

    let read = store
        .read("ünïcødé:目標", CredentialType::Generic)
        .unwrap()
        .unwrap();
    assert_eq!(without_timestamp(read), credential);
}

#[test]
fn test_delete_then_read_is_empty() {
    let (api, store) = memory_store();
    store.write(&svc_credential()).unwrap();

    store.delete("svc:api", CredentialType::Generic).unwrap();
    assert!(store
        .read("svc:api", CredentialType::Generic)
        .unwrap()
        .is_none());
    assert_buffers_released(&api);
}

#[test]
fn test_delete_missing_reports_not_found() {
    let (_api, store) = memory_store();
    let err = store
        .delete("never-written", CredentialType::Generic)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        CredentialError::Api {
            api: NativeCall::Delete,
            ..
        }
    ));
}

#[test]
fn test_comment_too_long_fails_before_native_call() {
    let (api, store) = memory_store();
    // 129 UTF-16 units is 258 encoded bytes.
    let credential = svc_credential().with_comment("c".repeat(129));

    match store.write(&credential).unwrap_err() {
        CredentialError::Validation(e) => {
            assert_eq!(e.field(), "comment");
            assert_eq!(e.limit(), Some(256));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(api.is_empty());
}

#[test]
fn test_secret_too_long() {
    let (_api, store) = memory_store();
    let credential = svc_credential().with_secret("s".repeat(1281));

    match store.write(&credential).unwrap_err() {
        CredentialError::Validation(e) => assert_eq!(e.field(), "secret"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_secret_ceiling_is_configurable() {
    let config = StoreConfig {
        max_blob_bytes: 512,
        ..StoreConfig::default()
    };
    let (_api, store) = memory_store_with(config);

    assert!(store
        .write(&svc_credential().with_secret("s".repeat(256)))
        .is_ok());
    assert!(store
        .write(&svc_credential().with_secret("s".repeat(257)))
        .is_err());
}

#[test]
fn test_field_length_boundaries() {
    let (api, store) = memory_store();

    let longest_target = "t".repeat(32767);
    let at_limit = Credential::new(&longest_target, CredentialType::Generic)
        .with_user_name("u".repeat(513))
        .with_attribute("k".repeat(128), json!(true));
    store.write(&at_limit).unwrap();
    let read = store
        .read(&longest_target, CredentialType::Generic)
        .unwrap()
        .expect("longest target should round trip");
    assert_eq!(without_timestamp(read), at_limit);

    let cases = [
        (
            Credential::new("t".repeat(32768), CredentialType::Generic),
            "target_name",
        ),
        (
            Credential::new("t", CredentialType::Generic).with_user_name("u".repeat(514)),
            "user_name",
        ),
        (
            Credential::new("t", CredentialType::Generic).with_attribute("k".repeat(129), json!(true)),
            "attribute_key",
        ),
    ];
    for (credential, field) in cases {
        match store.write(&credential).unwrap_err() {
            CredentialError::Validation(e) => assert_eq!(e.field(), field),
            other => panic!("expected validation error for {field}, got {other:?}"),
        }
    }
    assert_eq!(api.len(), 1);
    assert_buffers_released(&api);
}

#[test]
fn test_corrupt_attribute_is_skipped_on_read() {
    let (api, store) = memory_store();
    store.write(&svc_credential()).unwrap();
    assert!(api.put_raw_attribute(
        "svc:api",
        CredentialType::Generic,
        "cut",
        br#"{"a":1"#.to_vec()
    ));

    let read = store
        .read("svc:api", CredentialType::Generic)
        .unwrap()
        .unwrap();
    assert!(!read.attributes.contains_key("cut"));
    assert_eq!(without_timestamp(read), svc_credential());
}

#[test]
fn test_attribute_count_and_null_errors_are_distinct() {
    let (_api, store) = memory_store();

    let mut crowded = Credential::new("crowded", CredentialType::Generic);
    for i in 0..65 {
        crowded.attributes.insert(format!("k{i}"), json!(i));
    }
    let count_err = match store.write(&crowded).unwrap_err() {
        CredentialError::Validation(e) => e,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(count_err.field(), "attributes");
    assert_eq!(count_err.limit(), Some(64));

    let nulled = Credential::new("nulled", CredentialType::Generic).with_attribute("x", Value::Null);
    let null_err = match store.write(&nulled).unwrap_err() {
        CredentialError::Validation(e) => e,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert!(matches!(null_err, ValidationError::NullAttribute { .. }));
    assert_ne!(count_err, null_err);
}

#[test]
fn test_enumerate_contains_written_target() {
    let (api, store) = memory_store();
    store
        .write(&Credential::new("X", CredentialType::Generic).with_secret("s"))
        .unwrap();
    store.write(&svc_credential()).unwrap();

    let all = store.enumerate(None).unwrap().expect("non-empty store");
    assert!(all.iter().any(|c| c.target_name == "X"));
    assert_buffers_released(&api);
    assert_eq!(api.stats().wiped_blobs, 2);
}

#[test]
fn test_enumerate_no_match_is_none() {
    let (_api, store) = memory_store();
    store.write(&svc_credential()).unwrap();
    assert!(store.enumerate(Some("other:*")).unwrap().is_none());
}

#[test]
fn test_enumerate_native_failure() {
    let (api, store) = memory_store();
    store.write(&svc_credential()).unwrap();
    api.fail_next(NativeCall::Enumerate, NativeStatus::Generic(5));

    let err = store.enumerate(None).unwrap_err();
    assert!(matches!(
        err,
        CredentialError::Api {
            api: NativeCall::Enumerate,
            status: NativeStatus::Generic(5)
        }
    ));
}

#[test]
fn test_account_name_parsing() {
    let (_api, store) = memory_store();

    let name = store.parse_account_name(r"domain.com\mike").unwrap();
    assert_eq!(name.user, "mike");
    assert_eq!(name.domain, "domain.com");

    let name = store.parse_account_name("plainuser@domain.com").unwrap();
    assert_eq!(name.user, "plainuser@domain.com");
    assert_eq!(name.domain, "");
}

#[test]
fn test_svc_scenario() {
    let (api, store) = memory_store();

    let network = NetworkCredential::new("u", "p", "d");
    store
        .save_network(
            "svc",
            &network,
            CredentialType::Generic,
            Persistence::LocalMachine,
        )
        .unwrap();

    let read = store
        .get_network("svc", CredentialType::Generic)
        .unwrap()
        .expect("svc should exist");
    assert_eq!(read.user_name, "u");
    assert_eq!(read.password.expose_secret(), "p");
    assert_eq!(read.domain, "d");

    store.delete("svc", CredentialType::Generic).unwrap();
    assert!(store
        .get_network("svc", CredentialType::Generic)
        .unwrap()
        .is_none());
    assert_buffers_released(&api);
}

#[test]
fn test_concurrent_writers_last_write_wins() {
    let (api, store) = memory_store();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let store = store.clone();
            scope.spawn(move || {
                let credential =
                    Credential::new("shared", CredentialType::Generic).with_secret(format!("v{i}"));
                store.write(&credential).unwrap();
                store.read("shared", CredentialType::Generic).unwrap();
            });
        }
    });

    let read = store
        .read("shared", CredentialType::Generic)
        .unwrap()
        .unwrap();
    assert!(read.secret_str().unwrap().starts_with('v'));
    assert_eq!(api.len(), 1);
    assert_buffers_released(&api);
}

#[test]
fn test_basic_auth_from_stored_credential() {
    let (_api, store) = memory_store();
    store
        .save_network(
            "http",
            &NetworkCredential::new("Aladdin", "open sesame", ""),
            CredentialType::Generic,
            Persistence::Session,
        )
        .unwrap();

    let network = store
        .get_network("http", CredentialType::Generic)
        .unwrap()
        .unwrap();
    assert_eq!(network.basic_auth(), "QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
}
