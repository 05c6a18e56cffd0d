//! Credential type and persistence codes.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The sub-store a credential lives in.
///
/// The numeric codes are fixed by the platform store. Records of types this
/// crate does not model (for example domain-visible passwords) still show up
/// during enumeration and are carried as [`CredentialType::Other`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Application-managed credential, readable by the owning user.
    #[default]
    Generic,
    /// Domain password, consumed by the authentication packages only.
    Windows,
    /// Domain certificate credential.
    Certificate,
    /// Any other code reported by the store.
    Other(u32),
}

impl CredentialType {
    /// Native type code.
    pub fn code(self) -> u32 {
        match self {
            Self::Generic => 1,
            Self::Windows => 2,
            Self::Certificate => 3,
            Self::Other(code) => code,
        }
    }

    /// Map a native type code.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Generic,
            2 => Self::Windows,
            3 => Self::Certificate,
            other => Self::Other(other),
        }
    }

    /// Whether the store hands the secret blob back to applications.
    ///
    /// Domain passwords and certificates are only readable by the
    /// authentication packages; reads return them without a blob.
    pub fn secret_readable(self) -> bool {
        !matches!(self, Self::Windows | Self::Certificate)
    }

    /// Whether a write of this type must carry a user name.
    pub fn requires_user_name(self) -> bool {
        matches!(self, Self::Windows | Self::Certificate)
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("generic"),
            Self::Windows => f.write_str("windows"),
            Self::Certificate => f.write_str("certificate"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}

impl FromStr for CredentialType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "windows" | "domain" => Ok(Self::Windows),
            "certificate" | "cert" => Ok(Self::Certificate),
            other => other
                .parse::<u32>()
                .map(Self::from_code)
                .map_err(|_| Error::UnknownVariant {
                    kind: "credential type",
                    value: s.to_string(),
                }),
        }
    }
}

/// How widely and how long the store keeps a credential.
///
/// Controls retention and replication, not confidentiality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Lives for the current logon session only.
    Session,
    /// Persists on this machine; not replicated.
    #[default]
    LocalMachine,
    /// Persists and roams with the user's domain profile.
    Enterprise,
}

impl Persistence {
    /// Native persistence code.
    pub fn code(self) -> u32 {
        match self {
            Self::Session => 1,
            Self::LocalMachine => 2,
            Self::Enterprise => 3,
        }
    }

    /// Map a native persistence code, if it is one the store defines.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Session),
            2 => Some(Self::LocalMachine),
            3 => Some(Self::Enterprise),
            _ => None,
        }
    }
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::LocalMachine => "local_machine",
            Self::Enterprise => "enterprise",
        })
    }
}

impl FromStr for Persistence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "session" => Ok(Self::Session),
            "local_machine" | "local" | "machine" => Ok(Self::LocalMachine),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(Error::UnknownVariant {
                kind: "persistence",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(CredentialType::Generic.code(), 1);
        assert_eq!(CredentialType::Windows.code(), 2);
        assert_eq!(CredentialType::Certificate.code(), 3);
        assert_eq!(CredentialType::from_code(4), CredentialType::Other(4));
        assert_eq!(CredentialType::from_code(2), CredentialType::Windows);
    }

    #[test]
    fn test_persistence_codes() {
        assert_eq!(Persistence::Session.code(), 1);
        assert_eq!(Persistence::LocalMachine.code(), 2);
        assert_eq!(Persistence::Enterprise.code(), 3);
        assert_eq!(Persistence::from_code(0), None);
        assert_eq!(Persistence::from_code(3), Some(Persistence::Enterprise));
    }

    #[test]
    fn test_capabilities() {
        assert!(CredentialType::Generic.secret_readable());
        assert!(!CredentialType::Windows.secret_readable());
        assert!(CredentialType::Windows.requires_user_name());
        assert!(!CredentialType::Generic.requires_user_name());
    }

    #[test]
    fn test_parse_from_str() {
        assert_eq!("Domain".parse::<CredentialType>().unwrap(), CredentialType::Windows);
        assert_eq!("5".parse::<CredentialType>().unwrap(), CredentialType::Other(5));
        assert!("bogus".parse::<CredentialType>().is_err());
        assert_eq!(
            "local-machine".parse::<Persistence>().unwrap(),
            Persistence::LocalMachine
        );
        assert!("forever".parse::<Persistence>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Persistence::LocalMachine).unwrap();
        assert_eq!(json, "\"local_machine\"");
        let parsed: CredentialType = serde_json::from_str("\"certificate\"").unwrap();
        assert_eq!(parsed, CredentialType::Certificate);
    }
}
