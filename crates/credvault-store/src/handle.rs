//! Ownership guard for buffers returned by the native store.

use crate::attributes::AttributeCodec;
use crate::decode::decode;
use crate::error::{CredentialError, Result};
use crate::native::{NativeApi, RawCredential, RawCredentialList};
use credvault_core::Credential;
use std::slice;
use tracing::{trace, warn};
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Single(*mut RawCredential),
    Array {
        items: *mut *mut RawCredential,
        count: u32,
    },
}

/// Owns one native buffer until it is released.
///
/// A handle wraps either a single record from a read or the pointer array
/// from an enumeration. Releasing zeroes every secret blob in place and then
/// frees the buffer with one call; it runs at most once, on explicit
/// [`release`](Self::release) or on drop.
///
/// Holds raw pointers, so it is neither `Send` nor `Sync`.
pub struct CredentialHandle<'a> {
    api: &'a dyn NativeApi,
    shape: Option<Shape>,
}

impl<'a> CredentialHandle<'a> {
    /// Take ownership of a record returned by `api.read`.
    ///
    /// # Safety
    ///
    /// `record` must come from `api` and must not be owned by anything else.
    pub unsafe fn single(api: &'a dyn NativeApi, record: *mut RawCredential) -> Result<Self> {
        if record.is_null() {
            return Err(CredentialError::InvalidState("null credential pointer"));
        }
        Ok(Self {
            api,
            shape: Some(Shape::Single(record)),
        })
    }

    /// Take ownership of a pointer array returned by `api.enumerate`.
    ///
    /// # Safety
    ///
    /// `list` must come from `api` and must not be owned by anything else.
    pub unsafe fn array(api: &'a dyn NativeApi, list: RawCredentialList) -> Result<Self> {
        if list.items.is_null() {
            return Err(CredentialError::InvalidState("null credential array"));
        }
        Ok(Self {
            api,
            shape: Some(Shape::Array {
                items: list.items,
                count: list.count,
            }),
        })
    }

    pub fn is_released(&self) -> bool {
        self.shape.is_none()
    }

    /// Number of records held. Zero once released.
    pub fn len(&self) -> usize {
        match self.shape {
            Some(Shape::Single(_)) => 1,
            Some(Shape::Array { count, .. }) => count as usize,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> Result<Vec<*mut RawCredential>> {
        match self.shape {
            None => Err(CredentialError::InvalidState("handle already released")),
            Some(Shape::Single(record)) => Ok(vec![record]),
            Some(Shape::Array { items, count }) => {
                // SAFETY: the store hands back `count` contiguous pointers.
                let pointers = unsafe { slice::from_raw_parts(items, count as usize) };
                Ok(pointers.iter().copied().filter(|p| !p.is_null()).collect())
            }
        }
    }

    /// Decode the single record this handle owns.
    pub fn decode_one(&self, codec: &AttributeCodec) -> Result<Credential> {
        match self.shape {
            Some(Shape::Single(record)) => Ok(unsafe { decode(&*record, codec) }),
            Some(Shape::Array { .. }) => Err(CredentialError::InvalidState(
                "handle holds an enumeration, use decode_all",
            )),
            None => Err(CredentialError::InvalidState("handle already released")),
        }
    }

    /// Decode every record this handle owns, skipping null entries.
    pub fn decode_all(&self, codec: &AttributeCodec) -> Result<Vec<Credential>> {
        let records = self.records()?;
        if let Some(Shape::Array { count, .. }) = self.shape {
            if records.len() != count as usize {
                warn!(
                    expected = count,
                    found = records.len(),
                    "enumeration returned null entries"
                );
            }
        }
        Ok(records
            .into_iter()
            .map(|record| unsafe { decode(&*record, codec) })
            .collect())
    }

    /// Zero every secret blob and return the buffer to the store.
    ///
    /// Idempotent: later calls do nothing.
    pub fn release(&mut self) {
        let Ok(records) = self.records() else {
            return;
        };
        let Some(shape) = self.shape.take() else {
            return;
        };

        for record in records {
            // SAFETY: the record is still owned by this handle.
            unsafe { wipe_blob(record) };
        }

        let buffer = match shape {
            Shape::Single(record) => record.cast(),
            Shape::Array { items, .. } => items.cast(),
        };
        trace!("releasing credential handle");
        // SAFETY: `shape` was taken, so this is the only free of `buffer`.
        unsafe { self.api.free(buffer) };
    }
}

impl Drop for CredentialHandle<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CredentialHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHandle")
            .field("len", &self.len())
            .field("released", &self.is_released())
            .finish()
    }
}

unsafe fn wipe_blob(record: *mut RawCredential) {
    let raw = &*record;
    if !raw.blob.is_null() && raw.blob_size > 0 {
        slice::from_raw_parts_mut(raw.blob, raw.blob_size as usize).zeroize();
    }
}
