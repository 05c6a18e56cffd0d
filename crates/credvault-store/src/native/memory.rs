//! Process-local credential store that speaks the native ABI.
//!
//! Records written through [`MemoryApi`] are deep-copied out of the caller's
//! buffers. Reads and enumerations hand back freshly allocated native
//! records that must be returned through `free`, and every allocation is
//! tracked so tests can check that nothing leaks and every blob was zeroed
//! before it was freed.

use super::{
    read_wide_units, FileTime, NativeApi, RawAttribute, RawCredential, RawCredentialList,
    WideString,
};
use crate::encode::EncodedCredential;
use crate::error::{NativeCall, NativeStatus};
use chrono::Utc;
use credvault_core::{CredentialType, Persistence};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::ffi::c_void;
use std::ptr;
use std::slice;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Returned when a domain credential arrives without a user name.
const BAD_USER_NAME: u32 = 2202;

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Buffers handed out by read or enumerate.
    pub allocations: usize,
    /// Buffers returned through free.
    pub frees: usize,
    /// Frees of pointers that were not outstanding.
    pub invalid_frees: usize,
    /// Non-empty blobs that were all zeros when freed.
    pub wiped_blobs: usize,
    /// Non-empty blobs that still held data when freed.
    pub unwiped_blobs: usize,
}

impl MemoryStats {
    /// Buffers handed out and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.allocations - self.frees
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RecordKey {
    folded_target: String,
    credential_type: u32,
}

struct StoredRecord {
    flags: u32,
    credential_type: u32,
    target_name: Vec<u16>,
    comment: Option<Vec<u16>>,
    last_written: FileTime,
    blob: Zeroizing<Vec<u8>>,
    persist: u32,
    attributes: Vec<(Vec<u16>, Vec<u8>)>,
    target_alias: Option<Vec<u16>>,
    user_name: Option<Vec<u16>>,
}

impl StoredRecord {
    /// Deep-copy a caller's record.
    ///
    /// # Safety
    ///
    /// Every pointer in `raw` must be valid for the sizes it reports.
    unsafe fn copy_from(raw: &RawCredential) -> Result<Self, NativeStatus> {
        let target_name = read_wide_units(raw.target_name)
            .filter(|units| !units.is_empty())
            .ok_or(NativeStatus::InvalidParameter)?;

        if raw.credential_type == 0 || Persistence::from_code(raw.persist).is_none() {
            return Err(NativeStatus::InvalidParameter);
        }

        let user_name = read_wide_units(raw.user_name).filter(|units| !units.is_empty());
        if CredentialType::from_code(raw.credential_type).requires_user_name() && user_name.is_none()
        {
            return Err(NativeStatus::Generic(BAD_USER_NAME));
        }

        let blob = if raw.blob.is_null() || raw.blob_size == 0 {
            Vec::new()
        } else {
            slice::from_raw_parts(raw.blob, raw.blob_size as usize).to_vec()
        };

        let mut attributes = Vec::with_capacity(raw.attribute_count as usize);
        if !raw.attributes.is_null() {
            for entry in slice::from_raw_parts(raw.attributes, raw.attribute_count as usize) {
                let keyword = read_wide_units(entry.keyword).ok_or(NativeStatus::InvalidParameter)?;
                let value = if entry.value.is_null() || entry.value_size == 0 {
                    Vec::new()
                } else {
                    slice::from_raw_parts(entry.value, entry.value_size as usize).to_vec()
                };
                attributes.push((keyword, value));
            }
        }

        Ok(Self {
            flags: raw.flags,
            credential_type: raw.credential_type,
            target_name,
            comment: read_wide_units(raw.comment),
            last_written: FileTime::from_datetime(Utc::now()),
            blob: Zeroizing::new(blob),
            persist: raw.persist,
            attributes,
            target_alias: None,
            user_name,
        })
    }
}

/// A native record plus the buffers it points into. `raw` comes first so a
/// pointer to the record is also a pointer to the allocation.
#[repr(C)]
struct NativeRecord {
    raw: RawCredential,
    _target_name: WideString,
    _comment: Option<WideString>,
    _target_alias: Option<WideString>,
    _user_name: Option<WideString>,
    blob: Vec<u8>,
    _keywords: Vec<WideString>,
    _values: Vec<Vec<u8>>,
    _attributes: Box<[RawAttribute]>,
}

fn optional_ptr(value: &Option<WideString>) -> *mut u16 {
    value.as_ref().map_or(ptr::null_mut(), WideString::as_mut_ptr)
}

impl NativeRecord {
    fn from_stored(stored: &StoredRecord) -> Box<Self> {
        let target_name = WideString::from_units(stored.target_name.clone());
        let comment = stored.comment.clone().map(WideString::from_units);
        let target_alias = stored.target_alias.clone().map(WideString::from_units);
        let user_name = stored.user_name.clone().map(WideString::from_units);

        // Domain credentials come back without their secret.
        let mut blob = if CredentialType::from_code(stored.credential_type).secret_readable() {
            stored.blob.to_vec()
        } else {
            Vec::new()
        };

        let keywords: Vec<WideString> = stored
            .attributes
            .iter()
            .map(|(keyword, _)| WideString::from_units(keyword.clone()))
            .collect();
        let mut values: Vec<Vec<u8>> = stored.attributes.iter().map(|(_, v)| v.clone()).collect();
        let attributes: Box<[RawAttribute]> = keywords
            .iter()
            .zip(values.iter_mut())
            .map(|(keyword, value)| RawAttribute {
                keyword: keyword.as_mut_ptr(),
                flags: 0,
                value_size: value.len() as u32,
                value: if value.is_empty() {
                    ptr::null_mut()
                } else {
                    value.as_mut_ptr()
                },
            })
            .collect();

        let raw = RawCredential {
            flags: stored.flags,
            credential_type: stored.credential_type,
            target_name: target_name.as_mut_ptr(),
            comment: optional_ptr(&comment),
            last_written: stored.last_written,
            blob_size: blob.len() as u32,
            blob: if blob.is_empty() {
                ptr::null_mut()
            } else {
                blob.as_mut_ptr()
            },
            persist: stored.persist,
            attribute_count: attributes.len() as u32,
            attributes: if attributes.is_empty() {
                ptr::null_mut()
            } else {
                attributes.as_ptr().cast_mut()
            },
            target_alias: optional_ptr(&target_alias),
            user_name: optional_ptr(&user_name),
        };

        Box::new(Self {
            raw,
            _target_name: target_name,
            _comment: comment,
            _target_alias: target_alias,
            _user_name: user_name,
            blob,
            _keywords: keywords,
            _values: values,
            _attributes: attributes,
        })
    }

    /// `Some(true)` if the blob is non-empty and all zeros.
    fn blob_wiped(&self) -> Option<bool> {
        (!self.blob.is_empty()).then(|| self.blob.iter().all(|&b| b == 0))
    }
}

/// A buffer handed out and not yet freed.
struct Allocation {
    records: Vec<*mut NativeRecord>,
    pointers: Option<*mut [*mut RawCredential]>,
}

// SAFETY: the pointers are uniquely owned heap allocations; they are only
// touched while the store mutex is held or by the handle that borrowed them.
unsafe impl Send for Allocation {}

impl Allocation {
    /// Reclaim every buffer, returning how many blobs were wiped and not.
    ///
    /// # Safety
    ///
    /// Must be called once, after the caller is done with the buffer.
    unsafe fn reclaim(self) -> (usize, usize) {
        let mut wiped = 0;
        let mut unwiped = 0;
        for record in self.records {
            let record = Box::from_raw(record);
            match record.blob_wiped() {
                Some(true) => wiped += 1,
                Some(false) => unwiped += 1,
                None => {}
            }
        }
        if let Some(pointers) = self.pointers {
            drop(Box::from_raw(pointers));
        }
        (wiped, unwiped)
    }
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<RecordKey, StoredRecord>,
    live: HashMap<usize, Allocation>,
    stats: MemoryStats,
    failures: HashMap<NativeCall, NativeStatus>,
}

impl MemoryState {
    fn take_failure(&mut self, call: NativeCall) -> Result<(), NativeStatus> {
        match self.failures.remove(&call) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

fn fold(units: &[u16]) -> String {
    String::from_utf16_lossy(units).to_uppercase()
}

fn key_for(target: &WideString, credential_type: u32) -> RecordKey {
    RecordKey {
        folded_target: fold(target.units()),
        credential_type,
    }
}

/// Filter grammar: a trailing `*` matches any suffix; anything else must
/// match the whole target. Both are case-insensitive.
fn filter_matches(filter: &str, folded_target: &str) -> bool {
    match filter.strip_suffix('*') {
        Some(prefix) => folded_target.starts_with(prefix),
        None => folded_target == filter,
    }
}

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the allocation counters.
    pub fn stats(&self) -> MemoryStats {
        self.state.lock().stats
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `call` fail with `status`.
    pub fn fail_next(&self, call: NativeCall, status: NativeStatus) {
        self.state.lock().failures.insert(call, status);
    }

    /// Store raw attribute bytes on an existing record, bypassing the codec.
    ///
    /// Returns false if no such record exists.
    pub fn put_raw_attribute(
        &self,
        target: &str,
        credential_type: CredentialType,
        keyword: &str,
        value: Vec<u8>,
    ) -> bool {
        let key = key_for(&WideString::new(target), credential_type.code());
        let mut state = self.state.lock();
        let Some(record) = state.records.get_mut(&key) else {
            return false;
        };
        let keyword: Vec<u16> = keyword.encode_utf16().collect();
        record.attributes.retain(|(k, _)| *k != keyword);
        record.attributes.push((keyword, value));
        true
    }

    /// Overwrite the raw persistence code of an existing record.
    pub fn put_raw_persist(&self, target: &str, credential_type: CredentialType, code: u32) -> bool {
        let key = key_for(&WideString::new(target), credential_type.code());
        match self.state.lock().records.get_mut(&key) {
            Some(record) => {
                record.persist = code;
                true
            }
            None => false,
        }
    }

    /// Set the alias the store reports for an existing record.
    pub fn put_target_alias(&self, target: &str, credential_type: CredentialType, alias: &str) -> bool {
        let key = key_for(&WideString::new(target), credential_type.code());
        match self.state.lock().records.get_mut(&key) {
            Some(record) => {
                record.target_alias = Some(alias.encode_utf16().collect());
                true
            }
            None => false,
        }
    }
}

impl NativeApi for MemoryApi {
    fn write(&self, record: &EncodedCredential) -> Result<(), NativeStatus> {
        let mut state = self.state.lock();
        state.take_failure(NativeCall::Write)?;

        // SAFETY: the encoded record keeps its buffers alive for this call.
        let stored = unsafe { StoredRecord::copy_from(record.as_raw()) }?;
        let key = RecordKey {
            folded_target: fold(&stored.target_name),
            credential_type: stored.credential_type,
        };
        debug!(target_name = %key.folded_target, "memory store write");
        state.records.insert(key, stored);
        Ok(())
    }

    fn read(
        &self,
        target: &WideString,
        credential_type: u32,
    ) -> Result<*mut RawCredential, NativeStatus> {
        let mut state = self.state.lock();
        state.take_failure(NativeCall::Read)?;

        let stored = state
            .records
            .get(&key_for(target, credential_type))
            .ok_or(NativeStatus::NotFound)?;
        let record = Box::into_raw(NativeRecord::from_stored(stored));

        state.live.insert(
            record as usize,
            Allocation {
                records: vec![record],
                pointers: None,
            },
        );
        state.stats.allocations += 1;
        Ok(record.cast())
    }

    fn delete(&self, target: &WideString, credential_type: u32) -> Result<(), NativeStatus> {
        let mut state = self.state.lock();
        state.take_failure(NativeCall::Delete)?;

        state
            .records
            .remove(&key_for(target, credential_type))
            .map(|_| ())
            .ok_or(NativeStatus::NotFound)
    }

    fn enumerate(&self, filter: Option<&WideString>) -> Result<RawCredentialList, NativeStatus> {
        let mut state = self.state.lock();
        state.take_failure(NativeCall::Enumerate)?;

        let filter = filter.map(|f| fold(f.units()));
        let records: Vec<*mut NativeRecord> = state
            .records
            .iter()
            .filter(|(key, _)| {
                filter
                    .as_deref()
                    .map_or(true, |f| filter_matches(f, &key.folded_target))
            })
            .map(|(_, stored)| Box::into_raw(NativeRecord::from_stored(stored)))
            .collect();

        if records.is_empty() {
            return Err(NativeStatus::NotFound);
        }

        let pointers: Box<[*mut RawCredential]> = records.iter().map(|&r| r.cast::<RawCredential>()).collect();
        let count = pointers.len() as u32;
        let pointers = Box::into_raw(pointers);
        let items = pointers.cast::<*mut RawCredential>();

        state.live.insert(
            items as usize,
            Allocation {
                records,
                pointers: Some(pointers),
            },
        );
        state.stats.allocations += 1;
        Ok(RawCredentialList { items, count })
    }

    unsafe fn free(&self, buffer: *mut c_void) {
        let mut state = self.state.lock();
        let Some(allocation) = state.live.remove(&(buffer as usize)) else {
            warn!(address = buffer as usize, "free of a buffer that is not outstanding");
            state.stats.invalid_frees += 1;
            return;
        };

        let (wiped, unwiped) = allocation.reclaim();
        state.stats.frees += 1;
        state.stats.wiped_blobs += wiped;
        state.stats.unwiped_blobs += unwiped;
    }
}

impl Drop for MemoryApi {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.live.is_empty() {
            warn!(outstanding = state.live.len(), "memory store dropped with live buffers");
        }
        for (_, allocation) in state.live.drain() {
            // SAFETY: the store is going away; nothing can free these later.
            unsafe { allocation.reclaim() };
        }
    }
}

impl std::fmt::Debug for MemoryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryApi")
            .field("records", &state.records.len())
            .field("stats", &state.stats)
            .finish()
    }
}
