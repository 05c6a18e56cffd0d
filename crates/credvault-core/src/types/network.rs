//! User/secret/domain view of a credential.

use crate::secret::SecretString;
use base64::Engine;
use zeroize::Zeroizing;

/// A user name split into its account and domain parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountName {
    /// Account part.
    pub user: String,
    /// Domain part; empty when the name carried none.
    pub domain: String,
}

impl AccountName {
    /// Create an account name.
    pub fn new(user: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            domain: domain.into(),
        }
    }
}

/// A credential reduced to what a network login needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkCredential {
    /// Account name without the domain.
    pub user_name: String,
    /// Password or token.
    pub password: SecretString,
    /// Domain; empty when not applicable.
    pub domain: String,
}

impl NetworkCredential {
    /// Create a network credential.
    pub fn new(
        user_name: impl Into<String>,
        password: impl Into<SecretString>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            domain: domain.into(),
        }
    }

    /// Combine from a parsed account name and a secret.
    pub fn from_account(account: AccountName, password: SecretString) -> Self {
        Self {
            user_name: account.user,
            password,
            domain: account.domain,
        }
    }

    /// The user name as the store keeps it: `domain\user`, or just `user`
    /// when the domain is blank.
    pub fn combined_user_name(&self) -> String {
        if self.domain.trim().is_empty() {
            self.user_name.clone()
        } else {
            format!("{}\\{}", self.domain, self.user_name)
        }
    }

    /// Value for an HTTP `Authorization: Basic` header.
    ///
    /// Returns base64 of `user:password`. The plaintext buffer is wiped
    /// before returning.
    pub fn basic_auth(&self) -> String {
        let mut plain = Zeroizing::new(Vec::with_capacity(
            self.user_name.len() + 1 + self.password.len(),
        ));
        plain.extend_from_slice(self.user_name.as_bytes());
        plain.push(b':');
        plain.extend_from_slice(self.password.expose_secret().as_bytes());
        base64::engine::general_purpose::STANDARD.encode(plain.as_slice())
    }
}
