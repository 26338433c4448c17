//! UTF-16 conversions at the native boundary.
//!
//! Names cross into the store as NUL-terminated UTF-16; string payloads are
//! stored as UTF-16 code units in native byte order.

use super::status::{Result, StoreError, ERROR_INVALID_PARAMETER};

/// Encode `s` as NUL-terminated UTF-16.
///
/// An interior NUL would silently truncate the name on the native side, so it
/// is rejected with `ERROR_INVALID_PARAMETER`.
pub fn to_wide_nul(s: &str) -> Result<Vec<u16>> {
    let mut wide: Vec<u16> = s.encode_utf16().collect();
    if wide.contains(&0) {
        return Err(StoreError::new(ERROR_INVALID_PARAMETER));
    }
    wide.push(0);
    Ok(wide)
}

/// Decode UTF-16 without a terminator. Unpaired surrogates become U+FFFD.
pub fn from_wide(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// Length of a NUL-terminated name, excluding the terminator
pub fn wide_len(units: &[u16]) -> usize {
    units.iter().position(|&u| u == 0).unwrap_or(units.len())
}

/// Serialize code units in native byte order
pub fn units_to_bytes(units: &[u16]) -> Vec<u8> {
    units.iter().flat_map(|u| u.to_ne_bytes()).collect()
}

/// Reassemble code units from native byte order. A trailing odd byte is
/// dropped.
pub fn bytes_to_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}
