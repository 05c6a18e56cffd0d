//! Credential to native record encoding.

use crate::attributes::AttributeCodec;
use crate::error::ValidationError;
use crate::native::{RawAttribute, RawCredential, WideString};
use credvault_core::config::StoreConfig;
use credvault_core::{
    Credential, MAX_ATTRIBUTE_COUNT, MAX_ATTRIBUTE_KEY_BYTES, MAX_COMMENT_BYTES,
    MAX_TARGET_NAME_CHARS,
};
use std::ptr;
use zeroize::Zeroizing;

/// Longest user name the store accepts, in UTF-16 code units.
pub const MAX_USER_NAME_CHARS: usize = 513;

/// Size ceilings and policy applied before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeLimits {
    pub max_blob_bytes: usize,
    pub require_secret: bool,
}

impl EncodeLimits {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_blob_bytes: config.max_blob_bytes,
            require_secret: config.require_secret,
        }
    }
}

impl Default for EncodeLimits {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

fn utf16_bytes(value: &str) -> usize {
    value.encode_utf16().count() * 2
}

fn check_no_nul(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::InteriorNul {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validate the target name alone, as read and delete do.
pub fn validate_target(target_name: &str) -> Result<(), ValidationError> {
    if target_name.is_empty() {
        return Err(ValidationError::Empty {
            field: "target_name",
        });
    }
    check_no_nul("target_name", target_name)?;
    if target_name.encode_utf16().count() > MAX_TARGET_NAME_CHARS {
        return Err(ValidationError::TooLong {
            field: "target_name".to_string(),
            limit: MAX_TARGET_NAME_CHARS,
        });
    }
    Ok(())
}

/// Validate an enumeration filter before it is handed to the store.
pub fn validate_filter(filter: &str) -> Result<(), ValidationError> {
    check_no_nul("filter", filter)
}

/// Validate every scalar field of `credential` against `limits`.
///
/// Attribute values are checked by the codec while encoding.
pub fn validate(credential: &Credential, limits: &EncodeLimits) -> Result<(), ValidationError> {
    validate_target(&credential.target_name)?;

    if let Some(comment) = &credential.comment {
        check_no_nul("comment", comment)?;
        if utf16_bytes(comment) > MAX_COMMENT_BYTES {
            return Err(ValidationError::TooLong {
                field: "comment".to_string(),
                limit: MAX_COMMENT_BYTES,
            });
        }
    }

    match &credential.secret {
        Some(secret) if secret.utf16_len() * 2 > limits.max_blob_bytes => {
            return Err(ValidationError::TooLong {
                field: "secret".to_string(),
                limit: limits.max_blob_bytes,
            });
        }
        Some(secret) if secret.is_empty() && limits.require_secret => {
            return Err(ValidationError::Empty { field: "secret" });
        }
        None if limits.require_secret => {
            return Err(ValidationError::Empty { field: "secret" });
        }
        _ => {}
    }

    match credential.user_name.as_deref() {
        Some(user) if !user.is_empty() => {
            check_no_nul("user_name", user)?;
            if user.encode_utf16().count() > MAX_USER_NAME_CHARS {
                return Err(ValidationError::TooLong {
                    field: "user_name".to_string(),
                    limit: MAX_USER_NAME_CHARS,
                });
            }
        }
        _ if credential.credential_type.requires_user_name() => {
            return Err(ValidationError::Required {
                field: "user_name",
                credential_type: credential.credential_type,
            });
        }
        _ => {}
    }

    if credential.attributes.len() > MAX_ATTRIBUTE_COUNT {
        return Err(ValidationError::TooManyAttributes {
            count: credential.attributes.len(),
            limit: MAX_ATTRIBUTE_COUNT,
        });
    }
    for key in credential.attributes.keys() {
        if key.is_empty() {
            return Err(ValidationError::Empty {
                field: "attribute_key",
            });
        }
        check_no_nul("attribute_key", key)?;
        if utf16_bytes(key) > MAX_ATTRIBUTE_KEY_BYTES {
            return Err(ValidationError::AttributeKeyTooLong {
                key: key.clone(),
                limit: MAX_ATTRIBUTE_KEY_BYTES,
            });
        }
    }

    Ok(())
}

/// A native record together with every buffer it points into.
///
/// The pointers in the record stay valid for as long as this value lives.
/// Dropping it releases all buffers on every exit path; the secret blob is
/// zeroed first.
pub struct EncodedCredential {
    record: RawCredential,
    _target_name: WideString,
    _comment: Option<WideString>,
    _user_name: Option<WideString>,
    blob: Zeroizing<Vec<u8>>,
    _keywords: Vec<WideString>,
    _values: Vec<Vec<u8>>,
    _attributes: Box<[RawAttribute]>,
}

impl EncodedCredential {
    /// Validate `credential` and build its native record.
    ///
    /// Nothing is allocated for the record until every field, including
    /// each attribute value, has passed validation.
    pub fn encode(
        credential: &Credential,
        codec: &AttributeCodec,
        limits: &EncodeLimits,
    ) -> Result<Self, ValidationError> {
        validate(credential, limits)?;

        let values = credential
            .attributes
            .iter()
            .map(|(key, value)| codec.serialize(key, value))
            .collect::<Result<Vec<_>, _>>()?;

        let target_name = WideString::new(&credential.target_name);
        let comment = credential.comment.as_deref().map(WideString::new);
        let user_name = credential
            .user_name
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(WideString::new);
        let blob = credential
            .secret
            .as_ref()
            .map(|s| s.to_utf16_le_bytes())
            .unwrap_or_default();
        let keywords: Vec<WideString> = credential
            .attributes
            .keys()
            .map(|k| WideString::new(k))
            .collect();

        let attributes: Box<[RawAttribute]> = keywords
            .iter()
            .zip(&values)
            .map(|(keyword, value)| RawAttribute {
                keyword: keyword.as_mut_ptr(),
                flags: 0,
                value_size: value.len() as u32,
                value: value.as_ptr().cast_mut(),
            })
            .collect();

        let record = RawCredential {
            flags: 0,
            credential_type: credential.credential_type.code(),
            target_name: target_name.as_mut_ptr(),
            comment: comment.as_ref().map_or(ptr::null_mut(), WideString::as_mut_ptr),
            blob_size: blob.len() as u32,
            blob: if blob.is_empty() {
                ptr::null_mut()
            } else {
                blob.as_ptr().cast_mut()
            },
            persist: credential.persistence.code(),
            attribute_count: attributes.len() as u32,
            attributes: if attributes.is_empty() {
                ptr::null_mut()
            } else {
                attributes.as_ptr().cast_mut()
            },
            user_name: user_name
                .as_ref()
                .map_or(ptr::null_mut(), WideString::as_mut_ptr),
            ..RawCredential::empty()
        };

        Ok(Self {
            record,
            _target_name: target_name,
            _comment: comment,
            _user_name: user_name,
            blob,
            _keywords: keywords,
            _values: values,
            _attributes: attributes,
        })
    }

    pub fn as_raw(&self) -> &RawCredential {
        &self.record
    }

    pub fn as_ptr(&self) -> *const RawCredential {
        &self.record
    }

    /// The encoded secret bytes.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

impl std::fmt::Debug for EncodedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedCredential")
            .field("credential_type", &self.record.credential_type)
            .field("persist", &self.record.persist)
            .field("blob_size", &self.record.blob_size)
            .field("attribute_count", &self.record.attribute_count)
            .finish_non_exhaustive()
    }
}
