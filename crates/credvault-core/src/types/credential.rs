//! The credential record exchanged with the secret store.

use super::kind::{CredentialType, Persistence};
use super::network::NetworkCredential;
use crate::secret::SecretString;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Longest target name the store accepts, in UTF-16 code units.
pub const MAX_TARGET_NAME_CHARS: usize = 32_767;

/// Largest comment, in UTF-16 bytes.
pub const MAX_COMMENT_BYTES: usize = 256;

/// Default ceiling for the secret blob, in UTF-16 bytes.
///
/// Older platform releases only accept 512 bytes; newer ones accept five
/// times that. The ceiling is configurable per store.
pub const MAX_BLOB_BYTES: usize = 2560;

/// Most attributes a single credential may carry.
pub const MAX_ATTRIBUTE_COUNT: usize = 64;

/// Largest attribute keyword, in UTF-16 bytes.
pub const MAX_ATTRIBUTE_KEY_BYTES: usize = 256;

/// Largest serialized attribute value, in bytes.
pub const MAX_ATTRIBUTE_VALUE_BYTES: usize = 256;

/// A named secret plus its metadata.
///
/// Owns no native memory. Built by callers for a write, or decoded from a
/// native record returned by a read or an enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    /// Sub-store selector.
    pub credential_type: CredentialType,
    /// Lookup key.
    pub target_name: String,
    /// Free-form comment, not shown by the platform UI.
    pub comment: Option<String>,
    /// Set by the store on write; informational on read.
    pub last_written: Option<DateTime<Utc>>,
    /// Secret payload.
    pub secret: Option<SecretString>,
    /// Retention scope.
    pub persistence: Persistence,
    /// Auxiliary attributes, in insertion order.
    pub attributes: IndexMap<String, Value>,
    /// Account name; may be `domain\user` or a UPN. An empty name is stored
    /// as absent.
    pub user_name: Option<String>,
    /// Alias reported by the store. Never written.
    pub target_alias: Option<String>,
    /// Raw flags reported by the store. Written as zero.
    pub flags: u32,
}

impl Credential {
    /// Create an empty credential for `target_name`.
    pub fn new(target_name: impl Into<String>, credential_type: CredentialType) -> Self {
        Self {
            credential_type,
            target_name: target_name.into(),
            comment: None,
            last_written: None,
            secret: None,
            persistence: Persistence::default(),
            attributes: IndexMap::new(),
            user_name: None,
            target_alias: None,
            flags: 0,
        }
    }

    /// Build a generic credential from a user/secret/domain triple.
    ///
    /// The domain is folded into the user name as `domain\user` unless it
    /// is blank.
    pub fn from_network(target_name: impl Into<String>, network: &NetworkCredential) -> Self {
        let mut credential = Self::new(target_name, CredentialType::Generic);
        let user_name = network.combined_user_name();
        if !user_name.is_empty() {
            credential.user_name = Some(user_name);
        }
        credential.secret = Some(network.password.clone());
        credential
    }

    /// Set the user name.
    ///
    /// The store has no empty user name: `""` is written as no user name and
    /// reads back as `None`.
    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Set the secret.
    pub fn with_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the persistence scope.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    /// Attach an attribute value that is already a document value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attach an attribute converted from any serializable value.
    ///
    /// Replaces an existing attribute with the same key in place.
    pub fn set_attribute<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        self.attributes.insert(key.into(), value);
        Ok(())
    }

    /// Convert an attribute back into a concrete type.
    ///
    /// Returns `None` if the attribute is absent.
    pub fn attribute<T: DeserializeOwned>(&self, key: &str) -> Option<serde_json::Result<T>> {
        self.attributes
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
    }

    /// The secret as a string slice, if present.
    pub fn secret_str(&self) -> Option<&str> {
        self.secret.as_ref().map(SecretString::expose_secret)
    }
}
