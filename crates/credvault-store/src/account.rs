//! Account-name parsing.

use crate::error::{CredentialError, NativeCall, NativeStatus, Result};
use crate::native::NativeApi;
use credvault_core::AccountName;
use tracing::debug;

/// Buffer size for each parsed part, in UTF-16 units including the terminator.
pub const MAX_ACCOUNT_PART_CHARS: usize = 513;

/// Prefix of a marshaled certificate reference.
const MARSHALED_PREFIX: &str = "@@";

fn fits(part: &str, capacity: usize) -> bool {
    part.encode_utf16().count() < capacity
}

/// Split an account name the way the platform parser does.
///
/// Accepts `domain\user`, `user@domain` (kept whole, domain empty) and
/// marshaled certificate references (kept whole). A bare name with no
/// separator is reported as [`NativeStatus::InvalidAccountName`].
pub fn split_account_name(
    account: &str,
    user_capacity: usize,
    domain_capacity: usize,
) -> std::result::Result<AccountName, NativeStatus> {
    if user_capacity == 0 || domain_capacity == 0 {
        return Err(NativeStatus::InvalidParameter);
    }
    if account.is_empty() {
        return Err(NativeStatus::InvalidAccountName);
    }

    let (user, domain) = if account.starts_with(MARSHALED_PREFIX) {
        (account, "")
    } else if let Some((domain, user)) = account.split_once('\\') {
        if domain.is_empty() || user.is_empty() || user.contains('\\') {
            return Err(NativeStatus::InvalidAccountName);
        }
        (user, domain)
    } else if let Some((name, realm)) = account.split_once('@') {
        if name.is_empty() || realm.is_empty() {
            return Err(NativeStatus::InvalidAccountName);
        }
        (account, "")
    } else {
        return Err(NativeStatus::InvalidAccountName);
    };

    if !fits(user, user_capacity) || !fits(domain, domain_capacity) {
        return Err(NativeStatus::InsufficientBuffer);
    }
    Ok(AccountName::new(user, domain))
}

/// Parse `account` through `api`.
///
/// A name the parser cannot split is returned whole with an empty domain.
/// Any other failure, including a part too long for its buffer, is an error.
pub fn parse_account_name(api: &dyn NativeApi, account: &str) -> Result<AccountName> {
    match api.parse_user_name(account, MAX_ACCOUNT_PART_CHARS, MAX_ACCOUNT_PART_CHARS) {
        Ok(name) => Ok(name),
        Err(NativeStatus::InvalidAccountName) => {
            debug!(account, "account name has no domain part");
            Ok(AccountName::new(account, ""))
        }
        Err(status) => Err(CredentialError::api(NativeCall::ParseUserName, status)),
    }
}
