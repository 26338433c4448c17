//! Registry Value Types
//!
//! A [`Value`] is one typed datum read back from a key: a type tag and an
//! owned byte buffer sized exactly to the data.
//!
//! # Value Types
//! - REG_SZ: Null-terminated string
//! - REG_EXPAND_SZ: Null-terminated string with unexpanded %VARIABLE% references
//! - REG_BINARY: Binary data
//! - REG_DWORD: 32-bit integer
//! - REG_MULTI_SZ: List of null-terminated strings
//! - REG_QWORD: 64-bit integer
//!
//! Any other tag is kept as [`ValueType::Other`] and its payload is left as an
//! opaque blob.

use core::fmt;

use super::multi_sz::split_multistring;
use super::wide::{bytes_to_units, from_wide, wide_len};

/// Registry value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Null-terminated string
    Sz,
    /// Expandable string (with %VARIABLE% references)
    ExpandSz,
    /// Binary data
    Binary,
    /// 32-bit integer
    Dword,
    /// Array of null-terminated strings
    MultiSz,
    /// 64-bit integer
    Qword,
    /// Any tag this layer does not decode
    Other(u32),
}

impl ValueType {
    pub const REG_SZ: u32 = 1;
    pub const REG_EXPAND_SZ: u32 = 2;
    pub const REG_BINARY: u32 = 3;
    pub const REG_DWORD: u32 = 4;
    pub const REG_MULTI_SZ: u32 = 7;
    pub const REG_QWORD: u32 = 11;

    /// Create from raw value
    pub fn from_u32(value: u32) -> Self {
        match value {
            Self::REG_SZ => Self::Sz,
            Self::REG_EXPAND_SZ => Self::ExpandSz,
            Self::REG_BINARY => Self::Binary,
            Self::REG_DWORD => Self::Dword,
            Self::REG_MULTI_SZ => Self::MultiSz,
            Self::REG_QWORD => Self::Qword,
            other => Self::Other(other),
        }
    }

    /// Raw tag as passed to the native store
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Sz => Self::REG_SZ,
            Self::ExpandSz => Self::REG_EXPAND_SZ,
            Self::Binary => Self::REG_BINARY,
            Self::Dword => Self::REG_DWORD,
            Self::MultiSz => Self::REG_MULTI_SZ,
            Self::Qword => Self::REG_QWORD,
            Self::Other(raw) => *raw,
        }
    }

    /// Check if type is a string type
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Sz | Self::ExpandSz)
    }

    /// Check if type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Dword | Self::Qword)
    }
}

impl From<u32> for ValueType {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sz => f.write_str("REG_SZ"),
            Self::ExpandSz => f.write_str("REG_EXPAND_SZ"),
            Self::Binary => f.write_str("REG_BINARY"),
            Self::Dword => f.write_str("REG_DWORD"),
            Self::MultiSz => f.write_str("REG_MULTI_SZ"),
            Self::Qword => f.write_str("REG_QWORD"),
            Self::Other(raw) => write!(f, "REG_TYPE({raw})"),
        }
    }
}

/// Registry value (type + data)
///
/// The buffer is owned by the value and its length is always the data
/// length reported by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Value {
    ty: ValueType,
    data: Box<[u8]>,
}

impl Value {
    pub(crate) fn new(ty: ValueType, data: &[u8]) -> Self {
        Self {
            ty,
            data: data.into(),
        }
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    /// Raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get DWORD value
    pub fn dword(&self) -> Option<u32> {
        if self.ty != ValueType::Dword {
            return None;
        }
        let bytes = <[u8; 4]>::try_from(&self.data[..]).ok()?;
        Some(u32::from_ne_bytes(bytes))
    }

    /// Get QWORD value
    pub fn qword(&self) -> Option<u64> {
        if self.ty != ValueType::Qword {
            return None;
        }
        let bytes = <[u8; 8]>::try_from(&self.data[..]).ok()?;
        Some(u64::from_ne_bytes(bytes))
    }

    /// Get string value (REG_SZ or REG_EXPAND_SZ), up to the first NUL.
    ///
    /// Placeholders in REG_EXPAND_SZ are returned unexpanded.
    pub fn string(&self) -> Option<String> {
        if !self.ty.is_string() {
            return None;
        }
        let units = bytes_to_units(&self.data);
        Some(from_wide(&units[..wide_len(&units)]))
    }

    /// Get the string list of a REG_MULTI_SZ value
    pub fn multi_string(&self) -> Option<Vec<String>> {
        if self.ty != ValueType::MultiSz {
            return None;
        }
        Some(split_multistring(&bytes_to_units(&self.data)))
    }

    /// Consume into the raw buffer
    pub fn into_data(self) -> Box<[u8]> {
        self.data
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("ty", &self.ty)
            .field("len", &self.data.len())
            .finish()
    }
}
