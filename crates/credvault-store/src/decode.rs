//! Native record to credential decoding.

use crate::attributes::AttributeCodec;
use crate::error::AttributeError;
use crate::native::{read_wide_string, RawAttribute, RawCredential};
use credvault_core::{Credential, CredentialType, Persistence, SecretString};
use indexmap::IndexMap;
use serde_json::Value;
use std::slice;
use tracing::warn;
use zeroize::Zeroizing;

/// Copy a native record into an owned [`Credential`].
///
/// Never fails: unknown persistence codes fall back to session scope and
/// unreadable attributes are logged and skipped.
///
/// # Safety
///
/// Every non-null pointer in `raw` must be valid for the sizes the record
/// reports, and strings must be nul-terminated.
pub unsafe fn decode(raw: &RawCredential, codec: &AttributeCodec) -> Credential {
    let target_name = read_wide_string(raw.target_name).unwrap_or_default();
    let credential_type = CredentialType::from_code(raw.credential_type);

    let persistence = Persistence::from_code(raw.persist).unwrap_or_else(|| {
        warn!(
            target_name = %target_name,
            code = raw.persist,
            "unknown persistence code, treating as session"
        );
        Persistence::Session
    });

    let mut credential = Credential::new(target_name, credential_type);
    credential.persistence = persistence;
    credential.flags = raw.flags;
    credential.comment = read_wide_string(raw.comment);
    credential.user_name = read_wide_string(raw.user_name);
    credential.target_alias = read_wide_string(raw.target_alias);
    credential.last_written = raw.last_written.to_datetime();
    credential.secret = decode_secret(raw);
    credential.attributes = decode_attributes(raw, codec, &credential.target_name);
    credential
}

/// Decode the blob as UTF-16LE. Blobs shorter than one code unit carry no
/// secret; a trailing odd byte is ignored.
unsafe fn decode_secret(raw: &RawCredential) -> Option<SecretString> {
    if raw.blob.is_null() || raw.blob_size < 2 {
        return None;
    }
    let bytes = slice::from_raw_parts(raw.blob, raw.blob_size as usize);
    let units: Zeroizing<Vec<u16>> = Zeroizing::new(
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
    );
    Some(SecretString::new(String::from_utf16_lossy(&units)))
}

unsafe fn decode_attributes(
    raw: &RawCredential,
    codec: &AttributeCodec,
    target_name: &str,
) -> IndexMap<String, Value> {
    let mut attributes = IndexMap::new();
    if raw.attributes.is_null() || raw.attribute_count == 0 {
        return attributes;
    }

    let entries = slice::from_raw_parts(raw.attributes, raw.attribute_count as usize);
    for (index, entry) in entries.iter().enumerate() {
        match decode_attribute(index, entry, codec) {
            Ok((key, value)) => {
                attributes.insert(key, value);
            }
            Err(error) => warn!(target_name = %target_name, %error, "skipping attribute"),
        }
    }
    attributes
}

unsafe fn decode_attribute(
    index: usize,
    entry: &RawAttribute,
    codec: &AttributeCodec,
) -> Result<(String, Value), AttributeError> {
    let key = read_wide_string(entry.keyword).ok_or(AttributeError::Unreadable {
        index,
        reason: "missing keyword",
    })?;
    let bytes: &[u8] = match (entry.value.is_null(), entry.value_size) {
        (_, 0) => &[],
        (true, _) => {
            return Err(AttributeError::Unreadable {
                index,
                reason: "null value with non-zero size",
            })
        }
        (false, size) => slice::from_raw_parts(entry.value, size as usize),
    };
    let value = codec.deserialize(&key, bytes)?;
    Ok((key, value))
}
