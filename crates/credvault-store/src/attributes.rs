//! Attribute value codec.
//!
//! Values are written as compact JSON. Reads try an ordered chain of
//! decoders so records written in older encodings stay readable.

use crate::error::{AttributeError, ValidationError};
use credvault_core::config::StoreConfig;
use serde_json::Value;
use tracing::debug;

/// An encoding an attribute value may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// UTF-8 JSON document. The only format written.
    Json,
    /// Bare UTF-16LE text, read back as a JSON string.
    WideText,
}

impl AttributeFormat {
    fn decode(self, bytes: &[u8]) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Self::WideText => decode_wide_text(bytes).map(Value::String),
        }
    }
}

impl std::fmt::Display for AttributeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::WideText => f.write_str("wide-text"),
        }
    }
}

/// Legacy writers stored plain text as UTF-16LE. Bytes that are already
/// NUL-free UTF-8 are a damaged JSON document, not wide text.
fn decode_wide_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return Err(format!("{} bytes is not UTF-16 text", bytes.len()));
    }
    if !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
        return Err("value is UTF-8 text, not UTF-16".to_string());
    }
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    while units.last() == Some(&0) {
        units.pop();
    }
    let text = String::from_utf16(&units).map_err(|e| e.to_string())?;
    if let Some(c) = text.chars().find(|&c| !is_printable(c)) {
        return Err(format!("non-printable character U+{:04X}", c as u32));
    }
    Ok(text)
}

fn is_printable(c: char) -> bool {
    if matches!(c, '\t' | '\n' | '\r') {
        return true;
    }
    !(c.is_control()
        || matches!(c, '\u{fffd}' | '\u{fffe}' | '\u{ffff}')
        || ('\u{e000}'..='\u{f8ff}').contains(&c))
}

/// Serializes attribute values and decodes them with a fallback chain.
#[derive(Debug, Clone)]
pub struct AttributeCodec {
    max_value_bytes: usize,
    decoders: Vec<AttributeFormat>,
}

impl AttributeCodec {
    pub fn new(max_value_bytes: usize, legacy_fallback: bool) -> Self {
        let mut decoders = vec![AttributeFormat::Json];
        if legacy_fallback {
            decoders.push(AttributeFormat::WideText);
        }
        Self {
            max_value_bytes,
            decoders,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.max_attribute_value_bytes,
            config.legacy_attribute_fallback,
        )
    }

    pub fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }

    /// Decoders tried on read, in order.
    pub fn decoders(&self) -> &[AttributeFormat] {
        &self.decoders
    }

    /// Encode `value` for storage under `key`.
    pub fn serialize(&self, key: &str, value: &Value) -> Result<Vec<u8>, ValidationError> {
        if value.is_null() {
            return Err(ValidationError::NullAttribute {
                key: key.to_string(),
            });
        }

        let bytes = serde_json::to_vec(value).map_err(|e| ValidationError::Unserializable {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        if bytes.len() > self.max_value_bytes {
            return Err(ValidationError::TooLong {
                field: key.to_string(),
                limit: self.max_value_bytes,
            });
        }
        Ok(bytes)
    }

    /// Decode a stored value, trying each decoder until one succeeds.
    pub fn deserialize(&self, key: &str, bytes: &[u8]) -> Result<Value, AttributeError> {
        let mut failures = Vec::with_capacity(self.decoders.len());

        for (position, format) in self.decoders.iter().enumerate() {
            match format.decode(bytes) {
                Ok(value) => {
                    if position > 0 {
                        debug!(key, format = %format, "attribute decoded with legacy format");
                    }
                    return Ok(value);
                }
                Err(reason) => failures.push(format!("{format}: {reason}")),
            }
        }

        Err(AttributeError::Corrupted {
            key: key.to_string(),
            reason: failures.join("; "),
        })
    }
}

impl Default for AttributeCodec {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}
