//! Win32 registry backend.
//!
//! Thin FFI over `advapi32` through `windows-sys`. Every call maps its
//! status through [`check`]; no retry or translation happens here.

use core::ptr;

use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyExW, RegDeleteTreeW, RegDeleteValueW,
    RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW, RegQueryInfoKeyW, RegSetValueExW, HKEY,
    HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_PERFORMANCE_DATA, HKEY_USERS,
};

use super::{InfoClass, KeyInfo, NativeRegistry, ValueSlot};
use crate::registry::access::{Access, CreateOptions, Disposition, RootKey};
use crate::registry::status::{check, Result, StoreError, ERROR_INVALID_PARAMETER};

/// Raw `HKEY`
#[derive(Debug)]
pub struct Hkey(HKEY);

// HKEYs are process-wide handles with no thread affinity
unsafe impl Send for Hkey {}

impl Hkey {
    /// Handle of a predefined root. Never needs closing.
    pub fn predefined(root: RootKey) -> Self {
        Self(match root {
            RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
            RootKey::CurrentUser => HKEY_CURRENT_USER,
            RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
            RootKey::Users => HKEY_USERS,
            RootKey::PerformanceData => HKEY_PERFORMANCE_DATA,
            RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }

    /// Adopt a handle obtained elsewhere
    ///
    /// # Safety
    ///
    /// `raw` must be an open registry handle that nothing else closes.
    pub unsafe fn from_raw(raw: HKEY) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> HKEY {
        self.0
    }
}

/// Capacity actually usable in a buffer of `buf_len` elements
fn clamp_len(len: u32, buf_len: usize) -> u32 {
    len.min(u32::try_from(buf_len).unwrap_or(u32::MAX))
}

/// [`NativeRegistry`] backed by the system registry
#[derive(Debug, Clone, Copy)]
pub struct Win32Registry;

impl NativeRegistry for Win32Registry {
    type Raw = Hkey;
    type Security = SECURITY_ATTRIBUTES;

    fn create_key(
        parent: &Hkey,
        sub_key: &[u16],
        access: Access,
        options: CreateOptions,
        security: Option<&SECURITY_ATTRIBUTES>,
    ) -> Result<(Hkey, Disposition)> {
        let mut raw: HKEY = ptr::null_mut();
        let mut disposition = 0u32;
        let security = security.map_or(ptr::null(), |s| s as *const SECURITY_ATTRIBUTES);
        // SAFETY: sub_key is NUL-terminated; out pointers are valid locals.
        let status = unsafe {
            RegCreateKeyExW(
                parent.0,
                sub_key.as_ptr(),
                0,
                ptr::null(),
                options.bits(),
                access.bits(),
                security,
                &mut raw,
                &mut disposition,
            )
        };
        check(status)?;
        let disposition = Disposition::from_reported(disposition);
        Ok((Hkey(raw), disposition))
    }

    fn open_key(parent: &Hkey, sub_key: &[u16], access: Access) -> Result<Hkey> {
        let mut raw: HKEY = ptr::null_mut();
        // SAFETY: sub_key is NUL-terminated; raw is a valid local.
        let status = unsafe { RegOpenKeyExW(parent.0, sub_key.as_ptr(), 0, access.bits(), &mut raw) };
        check(status)?;
        Ok(Hkey(raw))
    }

    fn close_key(key: &Hkey) -> Result<()> {
        // SAFETY: the caller closes each handle exactly once.
        check(unsafe { RegCloseKey(key.0) })
    }

    fn set_value(key: &Hkey, name: &[u16], ty: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| StoreError::new(ERROR_INVALID_PARAMETER))?;
        // SAFETY: name is NUL-terminated; data is valid for len bytes.
        let status =
            unsafe { RegSetValueExW(key.0, name.as_ptr(), 0, ty, data.as_ptr(), len) };
        check(status)
    }

    fn query_info(key: &Hkey, class: InfoClass) -> Result<KeyInfo> {
        let mut subkeys = 0u32;
        let mut max_subkey_len = 0u32;
        let mut values = 0u32;
        let mut max_value_name_len = 0u32;
        let mut max_value_len = 0u32;
        // SAFETY: all out pointers are valid locals; unused ones are null.
        let status = unsafe {
            RegQueryInfoKeyW(
                key.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
                &mut subkeys,
                &mut max_subkey_len,
                ptr::null_mut(),
                &mut values,
                &mut max_value_name_len,
                &mut max_value_len,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check(status)?;

        Ok(match class {
            InfoClass::Subkeys => KeyInfo {
                count: subkeys,
                max_name_len: max_subkey_len,
                max_data_len: 0,
            },
            InfoClass::ValueNames => KeyInfo {
                count: values,
                max_name_len: max_value_name_len,
                max_data_len: 0,
            },
            InfoClass::Values => KeyInfo {
                count: values,
                max_name_len: max_value_name_len,
                max_data_len: max_value_len,
            },
        })
    }

    fn enum_key(key: &Hkey, index: u32, name: &mut [u16], name_len: &mut u32) -> Result<()> {
        *name_len = clamp_len(*name_len, name.len());
        // SAFETY: name holds at least *name_len units.
        let status = unsafe {
            RegEnumKeyExW(
                key.0,
                index,
                name.as_mut_ptr(),
                name_len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check(status)
    }

    fn enum_value(
        key: &Hkey,
        index: u32,
        name: &mut [u16],
        name_len: &mut u32,
        slot: Option<ValueSlot<'_>>,
    ) -> Result<()> {
        *name_len = clamp_len(*name_len, name.len());
        let (ty, data, data_len) = match slot {
            Some(ValueSlot { ty, data, data_len }) => {
                *data_len = clamp_len(*data_len, data.len());
                (ty as *mut u32, data.as_mut_ptr(), data_len as *mut u32)
            }
            None => (ptr::null_mut(), ptr::null_mut(), ptr::null_mut()),
        };
        // SAFETY: buffers hold at least the capacities passed alongside them.
        let status = unsafe {
            RegEnumValueW(
                key.0,
                index,
                name.as_mut_ptr(),
                name_len,
                ptr::null(),
                ty,
                data,
                data_len,
            )
        };
        check(status)
    }

    fn delete_value(key: &Hkey, name: &[u16]) -> Result<()> {
        // SAFETY: name is NUL-terminated.
        check(unsafe { RegDeleteValueW(key.0, name.as_ptr()) })
    }

    fn delete_key(key: &Hkey, sub_key: &[u16], access: Access) -> Result<()> {
        let view = access.intersection(Access::VIEW_FLAGS);
        // SAFETY: sub_key is NUL-terminated.
        check(unsafe { RegDeleteKeyExW(key.0, sub_key.as_ptr(), view.bits(), 0) })
    }

    fn delete_tree(key: &Hkey, sub_key: &[u16]) -> Result<()> {
        // An empty name clears the key itself, which RegDeleteTreeW spells as null
        let sub_key = if sub_key.first().map_or(true, |&u| u == 0) {
            ptr::null()
        } else {
            sub_key.as_ptr()
        };
        // SAFETY: sub_key is null or NUL-terminated.
        check(unsafe { RegDeleteTreeW(key.0, sub_key) })
    }
}
