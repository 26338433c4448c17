//! Registry Key Lifecycle
//!
//! A [`Key`] is either invalid (holds nothing) or owns exactly one open
//! native handle. Acquiring a new handle through `create`/`open` replaces and
//! releases the old one; a failed acquisition leaves the old one in place.
//! Dropping the key closes its handle.
//!
//! Parents are borrowed raw handles: a predefined root, or the handle of
//! another key via [`Key::get`].

use core::fmt;

use super::access::{Access, CreateOptions, Disposition};
use super::handle::OwnedKey;
use super::native::{NativeRegistry, SystemRegistry};
use super::status::{Result, StoreError, ERROR_INVALID_HANDLE};
use super::wide::to_wide_nul;

/// An open registry key
pub struct Key<N: NativeRegistry = SystemRegistry> {
    handle: Option<OwnedKey<N>>,
}

impl<N: NativeRegistry> Key<N> {
    /// An invalid key
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Create `sub_key` under `parent`, or open it if it already exists.
    ///
    /// On success the new handle replaces the current one. `security` is
    /// applied only when the key is created.
    pub fn create_with(
        &mut self,
        parent: &N::Raw,
        sub_key: &str,
        access: Access,
        options: CreateOptions,
        security: Option<&N::Security>,
    ) -> Result<Disposition> {
        let path = to_wide_nul(sub_key)?;
        let (raw, disposition) = N::create_key(parent, &path, access, options, security)?;
        log::debug!("[registry] {:?} {}", disposition, sub_key);
        self.handle = Some(OwnedKey::new(raw));
        Ok(disposition)
    }

    /// Create or open a non-volatile key with default security
    pub fn create(&mut self, parent: &N::Raw, sub_key: &str, access: Access) -> Result<()> {
        self.create_with(parent, sub_key, access, CreateOptions::default(), None)
            .map(|_| ())
    }

    /// Open an existing key
    pub fn open(&mut self, parent: &N::Raw, sub_key: &str, access: Access) -> Result<()> {
        let path = to_wide_nul(sub_key)?;
        let raw = N::open_key(parent, &path, access)?;
        log::debug!("[registry] opened {}", sub_key);
        self.handle = Some(OwnedKey::new(raw));
        Ok(())
    }

    /// Constructor form of [`create`](Self::create)
    pub fn created(parent: &N::Raw, sub_key: &str, access: Access) -> Result<Self> {
        let mut key = Self::new();
        key.create(parent, sub_key, access)?;
        Ok(key)
    }

    /// Constructor form of [`open`](Self::open)
    pub fn opened(parent: &N::Raw, sub_key: &str, access: Access) -> Result<Self> {
        let mut key = Self::new();
        key.open(parent, sub_key, access)?;
        Ok(key)
    }

    /// Create or open a key below this one
    pub fn create_subkey(&self, sub_key: &str, access: Access) -> Result<Self> {
        Self::created(self.raw()?, sub_key, access)
    }

    /// Open an existing key below this one
    pub fn open_subkey(&self, sub_key: &str, access: Access) -> Result<Self> {
        Self::opened(self.raw()?, sub_key, access)
    }

    /// Raw handle, still owned by this key
    pub fn get(&self) -> Option<&N::Raw> {
        self.handle.as_ref().map(OwnedKey::get)
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Raw handle, or `ERROR_INVALID_HANDLE` without touching the store
    pub(crate) fn raw(&self) -> Result<&N::Raw> {
        self.get().ok_or(StoreError::new(ERROR_INVALID_HANDLE))
    }
}

impl<N: NativeRegistry> Default for Key<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NativeRegistry> fmt::Debug for Key<N>
where
    N::Raw: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("handle", &self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::native::{Hive, KeySecurity, MemoryRegistry, NativeOp};
    use crate::registry::status::{ErrorKind, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};

    type MemKey = Key<MemoryRegistry>;

    #[test]
    fn test_default_key_is_invalid() {
        let key = MemKey::default();
        assert!(!key.is_valid());
        assert!(key.get().is_none());
        assert_eq!(key.raw().unwrap_err().code(), ERROR_INVALID_HANDLE);
    }

    #[test]
    fn test_create_reports_disposition() {
        let hive = Hive::new();
        let mut key = MemKey::new();
        let first = key
            .create_with(&hive.root(), "A", Access::default(), CreateOptions::default(), None)
            .unwrap();
        assert_eq!(first, Disposition::CreatedNewKey);

        let second = key
            .create_with(&hive.root(), "A", Access::default(), CreateOptions::default(), None)
            .unwrap();
        assert_eq!(second, Disposition::OpenedExistingKey);
        assert!(key.is_valid());
    }

    #[test]
    fn test_reacquire_releases_previous_handle() {
        let hive = Hive::new();
        let mut key = MemKey::new();
        key.create(&hive.root(), "A", Access::default()).unwrap();
        key.create(&hive.root(), "A", Access::default()).unwrap();
        assert_eq!(hive.open_handles(), 1);

        key.open(&hive.root(), "A", Access::READ).unwrap();
        assert_eq!(hive.open_handles(), 1);

        drop(key);
        assert_eq!(hive.open_handles(), 0);
    }

    #[test]
    fn test_failed_open_keeps_current_handle() {
        let hive = Hive::new();
        let mut key = MemKey::created(&hive.root(), "Kept", Access::default()).unwrap();

        let err = key.open(&hive.root(), "Missing", Access::READ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(key.is_valid());
        assert_eq!(hive.open_handles(), 1);

        hive.inject_fault(NativeOp::CreateKey, ERROR_ACCESS_DENIED);
        let err = key.create(&hive.root(), "Other", Access::default()).unwrap_err();
        assert_eq!(err.code(), ERROR_ACCESS_DENIED);
        assert!(key.is_valid());
    }

    #[test]
    fn test_interior_nul_in_path_is_rejected() {
        let hive = Hive::new();
        let err = MemKey::created(&hive.root(), "a\0b", Access::default()).unwrap_err();
        assert_eq!(err.code(), ERROR_INVALID_PARAMETER);
        assert_eq!(hive.open_handles(), 0);
    }

    #[test]
    fn test_subkeys_use_this_key_as_parent() {
        let hive = Hive::new();
        let parent = MemKey::created(&hive.root(), "Parent", Access::default()).unwrap();
        let child = parent.create_subkey("Child", Access::default()).unwrap();
        assert!(child.is_valid());

        assert!(MemKey::opened(&hive.root(), "Parent\\Child", Access::READ).is_ok());
        assert!(parent.open_subkey("child", Access::READ).is_ok());
        assert_eq!(
            MemKey::new().open_subkey("Child", Access::READ).unwrap_err().code(),
            ERROR_INVALID_HANDLE
        );
    }

    #[test]
    fn test_security_applies_to_created_key() {
        let hive = Hive::new();
        let mut key = MemKey::new();
        let security = KeySecurity::deny(Access::SET_VALUE);
        key.create_with(
            &hive.root(),
            "Guarded",
            Access::default(),
            CreateOptions::default(),
            Some(&security),
        )
        .unwrap();

        let err = MemKey::opened(&hive.root(), "Guarded", Access::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}
