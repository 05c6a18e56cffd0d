//! Native record layouts and wide-string helpers.
//!
//! Field order and widths match the platform headers exactly; these structs
//! cross the FFI boundary by pointer.

use chrono::{DateTime, Utc};
use credvault_core::MAX_TARGET_NAME_CHARS;
use std::ptr;

/// 100ns ticks between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Upper bound for scanning a wide string whose length the store did not report.
pub const MAX_WIDE_SCAN: usize = MAX_TARGET_NAME_CHARS + 1;

/// Split 64-bit timestamp, 100ns ticks since 1601-01-01 UTC.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTime {
    pub low: u32,
    pub high: u32,
}

impl FileTime {
    pub const ZERO: Self = Self { low: 0, high: 0 };

    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            low: ticks as u32,
            high: (ticks >> 32) as u32,
        }
    }

    pub fn ticks(self) -> u64 {
        (u64::from(self.high) << 32) | u64::from(self.low)
    }

    /// Convert to a UTC timestamp. Zero and out-of-range values yield `None`.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let ticks = self.ticks();
        if ticks == 0 {
            return None;
        }
        let since_unix = i64::try_from(ticks).ok()? - FILETIME_UNIX_OFFSET;
        let secs = since_unix.div_euclid(TICKS_PER_SECOND);
        let nanos = (since_unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Convert from a UTC timestamp, truncating to 100ns. Instants before
    /// 1601 clamp to zero.
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        let ticks = value
            .timestamp()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(value.timestamp_subsec_nanos() / 100)))
            .and_then(|t| t.checked_add(FILETIME_UNIX_OFFSET))
            .and_then(|t| u64::try_from(t).ok())
            .unwrap_or(0);
        Self::from_ticks(ticks)
    }
}

/// One attribute entry of a native record.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawAttribute {
    pub keyword: *mut u16,
    /// Reserved; always zero.
    pub flags: u32,
    pub value_size: u32,
    pub value: *mut u8,
}

/// The native credential record.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCredential {
    pub flags: u32,
    pub credential_type: u32,
    pub target_name: *mut u16,
    pub comment: *mut u16,
    pub last_written: FileTime,
    pub blob_size: u32,
    pub blob: *mut u8,
    pub persist: u32,
    pub attribute_count: u32,
    pub attributes: *mut RawAttribute,
    pub target_alias: *mut u16,
    pub user_name: *mut u16,
}

impl RawCredential {
    /// A record with every pointer null and every count zero.
    pub const fn empty() -> Self {
        Self {
            flags: 0,
            credential_type: 0,
            target_name: ptr::null_mut(),
            comment: ptr::null_mut(),
            last_written: FileTime::ZERO,
            blob_size: 0,
            blob: ptr::null_mut(),
            persist: 0,
            attribute_count: 0,
            attributes: ptr::null_mut(),
            target_alias: ptr::null_mut(),
            user_name: ptr::null_mut(),
        }
    }
}

/// Owned, nul-terminated UTF-16 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideString(Vec<u16>);

impl WideString {
    pub fn new(value: &str) -> Self {
        let mut units: Vec<u16> = value.encode_utf16().collect();
        units.push(0);
        Self(units)
    }

    /// Wrap units that carry no terminator.
    pub fn from_units(mut units: Vec<u16>) -> Self {
        units.push(0);
        Self(units)
    }

    /// Length in code units, not counting the terminator.
    pub fn len(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Units without the terminator.
    pub fn units(&self) -> &[u16] {
        &self.0[..self.len()]
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.0.as_ptr()
    }

    /// Pointer for record fields. The callee must not write through it.
    pub fn as_mut_ptr(&self) -> *mut u16 {
        self.0.as_ptr().cast_mut()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.units())
    }
}

/// Copy the units of a nul-terminated wide string.
///
/// Returns `None` for a null pointer or when no terminator appears within
/// [`MAX_WIDE_SCAN`] units.
///
/// # Safety
///
/// `ptr` must be null or point to readable memory up to its terminator or
/// [`MAX_WIDE_SCAN`] units, whichever comes first.
pub unsafe fn read_wide_units(ptr: *const u16) -> Option<Vec<u16>> {
    if ptr.is_null() {
        return None;
    }
    let mut units = Vec::new();
    for offset in 0..MAX_WIDE_SCAN {
        let unit = *ptr.add(offset);
        if unit == 0 {
            return Some(units);
        }
        units.push(unit);
    }
    None
}

/// Read a nul-terminated wide string, replacing unpaired surrogates.
///
/// # Safety
///
/// Same contract as [`read_wide_units`].
pub unsafe fn read_wide_string(ptr: *const u16) -> Option<String> {
    read_wide_units(ptr).map(|units| String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::mem::{offset_of, size_of};

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_record_layout_64() {
        assert_eq!(size_of::<RawCredential>(), 80);
        assert_eq!(offset_of!(RawCredential, target_name), 8);
        assert_eq!(offset_of!(RawCredential, last_written), 24);
        assert_eq!(offset_of!(RawCredential, blob_size), 32);
        assert_eq!(offset_of!(RawCredential, blob), 40);
        assert_eq!(offset_of!(RawCredential, persist), 48);
        assert_eq!(offset_of!(RawCredential, attributes), 56);
        assert_eq!(offset_of!(RawCredential, user_name), 72);

        assert_eq!(size_of::<RawAttribute>(), 24);
        assert_eq!(offset_of!(RawAttribute, value_size), 12);
        assert_eq!(offset_of!(RawAttribute, value), 16);
    }

    #[test]
    fn test_filetime_zero_is_none() {
        assert_eq!(FileTime::ZERO.to_datetime(), None);
    }

    #[test]
    fn test_filetime_unix_epoch() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let ft = FileTime::from_datetime(epoch);
        assert_eq!(ft.ticks(), FILETIME_UNIX_OFFSET as u64);
        assert_eq!(ft.to_datetime(), Some(epoch));
    }

    #[test]
    fn test_filetime_truncates_to_100ns() {
        let instant = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let back = FileTime::from_datetime(instant).to_datetime().unwrap();
        assert_eq!(back.timestamp(), 1_700_000_000);
        assert_eq!(back.timestamp_subsec_nanos(), 123_456_700);
    }

    #[test]
    fn test_filetime_before_1601_clamps() {
        let ancient = Utc.with_ymd_and_hms(1500, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(FileTime::from_datetime(ancient), FileTime::ZERO);
    }

    #[test]
    fn test_filetime_split_halves() {
        let ft = FileTime::from_ticks(0x0123_4567_89ab_cdef);
        assert_eq!(ft.high, 0x0123_4567);
        assert_eq!(ft.low, 0x89ab_cdef);
    }

    #[test]
    fn test_wide_string_round_trip() {
        let wide = WideString::new("svc:é");
        assert_eq!(wide.len(), 5);
        let read = unsafe { read_wide_string(wide.as_ptr()) };
        assert_eq!(read.as_deref(), Some("svc:é"));
    }

    #[test]
    fn test_read_wide_null() {
        assert_eq!(unsafe { read_wide_string(ptr::null()) }, None);
    }

    #[test]
    fn test_read_wide_without_terminator() {
        let units = vec![b'a' as u16; MAX_WIDE_SCAN];
        assert_eq!(unsafe { read_wide_units(units.as_ptr()) }, None);
    }
}
