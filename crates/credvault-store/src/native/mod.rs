//! The native credential API seam.
//!
//! [`NativeApi`] is the five-call surface of the platform credential store
//! plus the account-name parser. Store operations depend on it as an injected
//! capability: the Windows binding talks to the platform, [`MemoryApi`]
//! serves the same ABI from process memory.

mod layout;
mod memory;
#[cfg(windows)]
mod windows;

pub use layout::*;
pub use memory::{MemoryApi, MemoryStats};
#[cfg(windows)]
pub use windows::WindowsApi;

use crate::account;
use crate::encode::EncodedCredential;
use crate::error::NativeStatus;
use credvault_core::AccountName;
use std::ffi::c_void;

/// Pointer array returned by an enumeration.
#[derive(Debug, Clone, Copy)]
pub struct RawCredentialList {
    pub items: *mut *mut RawCredential,
    pub count: u32,
}

/// The platform credential store, as seen through its C ABI.
///
/// Every buffer returned by [`read`](NativeApi::read) or
/// [`enumerate`](NativeApi::enumerate) belongs to the implementation and must
/// be handed back through [`free`](NativeApi::free) exactly once.
pub trait NativeApi: Send + Sync {
    /// Create or overwrite the record keyed by its target and type.
    fn write(&self, record: &EncodedCredential) -> Result<(), NativeStatus>;

    /// Fetch one record. The returned buffer must be freed.
    fn read(&self, target: &WideString, credential_type: u32)
        -> Result<*mut RawCredential, NativeStatus>;

    /// Remove one record.
    fn delete(&self, target: &WideString, credential_type: u32) -> Result<(), NativeStatus>;

    /// Fetch every record matching `filter`, or all records when `None`.
    /// The pointer array is a single buffer that must be freed.
    fn enumerate(&self, filter: Option<&WideString>) -> Result<RawCredentialList, NativeStatus>;

    /// Return a buffer obtained from `read` or `enumerate`.
    ///
    /// # Safety
    ///
    /// `buffer` must have come from this implementation and must not have
    /// been freed already. Nothing may dereference it afterwards.
    unsafe fn free(&self, buffer: *mut c_void);

    /// Split an account name into user and domain.
    ///
    /// Capacities are in UTF-16 units including the terminator.
    fn parse_user_name(
        &self,
        account: &str,
        user_capacity: usize,
        domain_capacity: usize,
    ) -> Result<AccountName, NativeStatus> {
        account::split_account_name(account, user_capacity, domain_capacity)
    }
}
