//! Registry Status Codes
//!
//! Every native registry call reports a Win32 status code. The codes are an
//! external contract of the platform; this module names the ones the registry
//! layer produces or inspects and wraps a failing code in [`StoreError`].
//!
//! # Classification
//! - NotFound: key or value does not exist, or was deleted under a handle
//! - AccessDenied: access mask refused by the key's security
//! - InvalidArgument: bad handle, path, name or option combination
//! - ResourceExhausted: quota, memory or caller buffer too small
//! - HasChildren: non-recursive delete of a key with subkeys
//! - Unexpected: anything else, carried verbatim

use core::fmt;

/// Raw Win32 status code
pub type Status = u32;

pub const ERROR_SUCCESS: Status = 0;
pub const ERROR_FILE_NOT_FOUND: Status = 2;
pub const ERROR_PATH_NOT_FOUND: Status = 3;
pub const ERROR_ACCESS_DENIED: Status = 5;
pub const ERROR_INVALID_HANDLE: Status = 6;
pub const ERROR_NOT_ENOUGH_MEMORY: Status = 8;
pub const ERROR_INVALID_DATA: Status = 13;
pub const ERROR_OUTOFMEMORY: Status = 14;
pub const ERROR_INVALID_PARAMETER: Status = 87;
pub const ERROR_INSUFFICIENT_BUFFER: Status = 122;
pub const ERROR_BAD_PATHNAME: Status = 161;
pub const ERROR_MORE_DATA: Status = 234;
pub const ERROR_NO_MORE_ITEMS: Status = 259;
pub const ERROR_REGISTRY_QUOTA_LIMIT: Status = 613;
pub const ERROR_BADKEY: Status = 1010;
pub const ERROR_KEY_DELETED: Status = 1018;
pub const ERROR_KEY_HAS_CHILDREN: Status = 1020;
pub const ERROR_CHILD_MUST_BE_VOLATILE: Status = 1021;
pub const ERROR_PRIVILEGE_NOT_HELD: Status = 1314;
pub const ERROR_NO_SYSTEM_RESOURCES: Status = 1450;
pub const ERROR_NOT_ENOUGH_QUOTA: Status = 1816;

/// Coarse class of a failing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    InvalidArgument,
    ResourceExhausted,
    HasChildren,
    Unexpected,
}

impl ErrorKind {
    /// Classify a raw status code
    pub fn from_status(code: Status) -> Self {
        match code {
            ERROR_FILE_NOT_FOUND
            | ERROR_PATH_NOT_FOUND
            | ERROR_NO_MORE_ITEMS
            | ERROR_KEY_DELETED => Self::NotFound,
            ERROR_ACCESS_DENIED | ERROR_PRIVILEGE_NOT_HELD => Self::AccessDenied,
            ERROR_INVALID_HANDLE
            | ERROR_INVALID_DATA
            | ERROR_INVALID_PARAMETER
            | ERROR_BAD_PATHNAME
            | ERROR_BADKEY
            | ERROR_CHILD_MUST_BE_VOLATILE => Self::InvalidArgument,
            ERROR_NOT_ENOUGH_MEMORY
            | ERROR_OUTOFMEMORY
            | ERROR_INSUFFICIENT_BUFFER
            | ERROR_MORE_DATA
            | ERROR_REGISTRY_QUOTA_LIMIT
            | ERROR_NO_SYSTEM_RESOURCES
            | ERROR_NOT_ENOUGH_QUOTA => Self::ResourceExhausted,
            ERROR_KEY_HAS_CHILDREN => Self::HasChildren,
            _ => Self::Unexpected,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::AccessDenied => "access denied",
            Self::InvalidArgument => "invalid argument",
            Self::ResourceExhausted => "resource exhausted",
            Self::HasChildren => "key has children",
            Self::Unexpected => "unexpected status",
        };
        f.write_str(s)
    }
}

/// A failed registry call, carrying the platform status unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("registry call failed: {kind} (status {code})")]
pub struct StoreError {
    code: Status,
    kind: ErrorKind,
}

impl StoreError {
    /// Wrap a status code. `ERROR_SUCCESS` is not an error and must not be
    /// passed here; use [`check`] for raw call results.
    pub fn new(code: Status) -> Self {
        Self {
            code,
            kind: ErrorKind::from_status(code),
        }
    }

    /// The platform status code
    pub const fn code(&self) -> Status {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result alias for registry operations
pub type Result<T> = core::result::Result<T, StoreError>;

/// Turn a raw call status into a `Result`
#[inline]
pub fn check(code: Status) -> Result<()> {
    if code == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(StoreError::new(code))
    }
}
