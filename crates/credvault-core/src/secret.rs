//! Secure string handling for credential secrets.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A string that is zeroed on drop.
///
/// Holds the credential secret (password or token) between the moment it is
/// decoded out of native memory and the moment the caller is done with it.
/// Never printed: `Debug` and `Display` both emit `[REDACTED]`.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    /// Create a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Expose the secret value.
    ///
    /// Use sparingly - only when the actual value is needed.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Check if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Length of the secret in UTF-8 bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Number of UTF-16 code units the secret occupies once widened.
    pub fn utf16_len(&self) -> usize {
        self.inner.encode_utf16().count()
    }

    /// The secret as little-endian UTF-16 bytes, without a terminator.
    ///
    /// The returned buffer is wiped when dropped.
    pub fn to_utf16_le_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(self.utf16_len() * 2));
        for unit in self.inner.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }
}

// Never print secrets
impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.inner.as_bytes(), other.inner.as_bytes())
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_secret_string_equality() {
        assert_eq!(SecretString::new("p"), SecretString::new("p"));
        assert_ne!(SecretString::new("p"), SecretString::new("q"));
        assert_ne!(SecretString::new("p"), SecretString::new("pp"));
    }

    #[test]
    fn test_utf16_len_counts_surrogate_pairs() {
        assert_eq!(SecretString::new("abc").utf16_len(), 3);
        // U+1F511 needs a surrogate pair.
        assert_eq!(SecretString::new("\u{1F511}").utf16_len(), 2);
    }

    #[test]
    fn test_to_utf16_le_bytes() {
        let bytes = SecretString::new("pé").to_utf16_le_bytes();
        assert_eq!(bytes.as_slice(), &[0x70, 0x00, 0xE9, 0x00]);
    }
}
