//! Bindings to the platform credential manager.

use super::{NativeApi, RawCredential, RawCredentialList, WideString};
use crate::encode::EncodedCredential;
use crate::error::NativeStatus;
use credvault_core::AccountName;
use std::ffi::c_void;
use std::io;
use std::ptr;
use tracing::trace;

type Bool = i32;

#[link(name = "advapi32")]
extern "system" {
    fn CredWriteW(credential: *const RawCredential, flags: u32) -> Bool;
    fn CredReadW(
        target_name: *const u16,
        credential_type: u32,
        flags: u32,
        credential: *mut *mut RawCredential,
    ) -> Bool;
    fn CredDeleteW(target_name: *const u16, credential_type: u32, flags: u32) -> Bool;
    fn CredEnumerateW(
        filter: *const u16,
        flags: u32,
        count: *mut u32,
        credentials: *mut *mut *mut RawCredential,
    ) -> Bool;
    fn CredFree(buffer: *const c_void);
}

#[link(name = "credui")]
extern "system" {
    fn CredUIParseUserNameW(
        user_name: *const u16,
        user: *mut u16,
        user_buffer_size: u32,
        domain: *mut u16,
        domain_buffer_size: u32,
    ) -> u32;
}

fn last_status() -> NativeStatus {
    let code = io::Error::last_os_error().raw_os_error().unwrap_or(0) as u32;
    NativeStatus::from_code(code)
}

fn check(ok: Bool) -> Result<(), NativeStatus> {
    if ok != 0 {
        Ok(())
    } else {
        Err(last_status())
    }
}

/// The current user's credential set in the platform credential manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsApi;

impl WindowsApi {
    pub fn new() -> Self {
        Self
    }
}

impl NativeApi for WindowsApi {
    fn write(&self, record: &EncodedCredential) -> Result<(), NativeStatus> {
        // SAFETY: the encoded record keeps every buffer it points to alive.
        check(unsafe { CredWriteW(record.as_ptr(), 0) })
    }

    fn read(
        &self,
        target: &WideString,
        credential_type: u32,
    ) -> Result<*mut RawCredential, NativeStatus> {
        let mut out = ptr::null_mut();
        check(unsafe { CredReadW(target.as_ptr(), credential_type, 0, &mut out) })?;
        Ok(out)
    }

    fn delete(&self, target: &WideString, credential_type: u32) -> Result<(), NativeStatus> {
        check(unsafe { CredDeleteW(target.as_ptr(), credential_type, 0) })
    }

    fn enumerate(&self, filter: Option<&WideString>) -> Result<RawCredentialList, NativeStatus> {
        let filter = filter.map_or(ptr::null(), WideString::as_ptr);
        let mut count = 0u32;
        let mut items = ptr::null_mut();
        check(unsafe { CredEnumerateW(filter, 0, &mut count, &mut items) })?;
        Ok(RawCredentialList { items, count })
    }

    unsafe fn free(&self, buffer: *mut c_void) {
        trace!("releasing native credential buffer");
        CredFree(buffer);
    }

    fn parse_user_name(
        &self,
        account: &str,
        user_capacity: usize,
        domain_capacity: usize,
    ) -> Result<AccountName, NativeStatus> {
        let account = WideString::new(account);
        let mut user = vec![0u16; user_capacity];
        let mut domain = vec![0u16; domain_capacity];

        let status = unsafe {
            CredUIParseUserNameW(
                account.as_ptr(),
                user.as_mut_ptr(),
                user_capacity as u32,
                domain.as_mut_ptr(),
                domain_capacity as u32,
            )
        };
        match NativeStatus::from_code(status) {
            NativeStatus::Success => Ok(AccountName::new(until_nul(&user), until_nul(&domain))),
            other => Err(other),
        }
    }
}

fn until_nul(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&u| u == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}
