//! Native Store Interface
//!
//! The registry layer talks to the store only through [`NativeRegistry`],
//! a one-to-one rendering of the Win32 registry calls it needs:
//!
//! - `create_key` / `open_key` / `close_key` - RegCreateKeyExW, RegOpenKeyExW, RegCloseKey
//! - `set_value` - RegSetValueExW
//! - `query_info` - RegQueryInfoKeyW
//! - `enum_key` / `enum_value` - RegEnumKeyExW, RegEnumValueW
//! - `delete_value` / `delete_key` / `delete_tree` - RegDeleteValueW, RegDeleteKeyExW, RegDeleteTreeW
//!
//! Names are NUL-terminated UTF-16. Enumeration keeps the native
//! caller-allocated buffer contract: the in/out length holds the capacity
//! (in units, terminator included) on entry and the written length
//! (terminator excluded) on return. A capacity that is too small fails with
//! `ERROR_MORE_DATA`.
//!
//! Two implementations exist: [`Win32Registry`] on Windows and
//! [`MemoryRegistry`], an in-process store with the same semantics.

pub mod hive;
#[cfg(windows)]
pub mod win32;

pub use hive::{Hive, HiveConfig, KeySecurity, MemoryKey, MemoryRegistry, NativeOp};
#[cfg(windows)]
pub use win32::{Hkey, Win32Registry};

use super::access::{Access, CreateOptions, Disposition};
use super::status::Result;

/// The store backing [`Key`](super::Key) when no backend is named
#[cfg(windows)]
pub type SystemRegistry = Win32Registry;

/// The store backing [`Key`](super::Key) when no backend is named
#[cfg(not(windows))]
pub type SystemRegistry = MemoryRegistry;

/// Which metadata a `query_info` call asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoClass {
    /// Subkey count and longest subkey name
    Subkeys,
    /// Value count and longest value name
    ValueNames,
    /// Value count, longest value name and largest value data
    Values,
}

/// Result of a metadata query
///
/// Name lengths are in UTF-16 units without the terminator; data length is in
/// bytes. Fields outside the requested [`InfoClass`] are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub count: u32,
    pub max_name_len: u32,
    pub max_data_len: u32,
}

/// Output slot for the type and data of an enumerated value
pub struct ValueSlot<'a> {
    pub ty: &'a mut u32,
    pub data: &'a mut [u8],
    /// Capacity in bytes on entry, bytes written on return
    pub data_len: &'a mut u32,
}

/// Native registry API
pub trait NativeRegistry {
    /// An open key handle
    type Raw;
    /// Security information applied to newly created keys
    type Security;

    /// Create `sub_key` under `parent`, or open it if it exists
    fn create_key(
        parent: &Self::Raw,
        sub_key: &[u16],
        access: Access,
        options: CreateOptions,
        security: Option<&Self::Security>,
    ) -> Result<(Self::Raw, Disposition)>;

    /// Open an existing `sub_key` under `parent`
    fn open_key(parent: &Self::Raw, sub_key: &[u16], access: Access) -> Result<Self::Raw>;

    /// Release a handle. Called exactly once per handle.
    fn close_key(key: &Self::Raw) -> Result<()>;

    /// Write a named value, replacing any value of the same name
    fn set_value(key: &Self::Raw, name: &[u16], ty: u32, data: &[u8]) -> Result<()>;

    fn query_info(key: &Self::Raw, class: InfoClass) -> Result<KeyInfo>;

    /// Fetch the name of the subkey at `index`
    fn enum_key(key: &Self::Raw, index: u32, name: &mut [u16], name_len: &mut u32) -> Result<()>;

    /// Fetch the name, and optionally type and data, of the value at `index`
    fn enum_value(
        key: &Self::Raw,
        index: u32,
        name: &mut [u16],
        name_len: &mut u32,
        slot: Option<ValueSlot<'_>>,
    ) -> Result<()>;

    fn delete_value(key: &Self::Raw, name: &[u16]) -> Result<()>;

    /// Delete one empty subkey. `access` selects the registry view.
    fn delete_key(key: &Self::Raw, sub_key: &[u16], access: Access) -> Result<()>;

    /// Delete a subkey and everything below it
    fn delete_tree(key: &Self::Raw, sub_key: &[u16]) -> Result<()>;
}
