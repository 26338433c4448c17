//! Access Masks and Create Options
//!
//! Platform-defined flag sets passed through to the native store unchanged:
//! - [`Access`]: REGSAM access rights requested when a key is opened
//! - [`CreateOptions`]: REG_OPTION_* flags for key creation
//! - [`Disposition`]: whether a create call made a new key
//! - [`RootKey`]: the predefined top-level keys

bitflags::bitflags! {
    /// Requested access rights for a key handle (REGSAM)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        /// Query values
        const QUERY_VALUE = 0x0001;
        /// Create, overwrite or delete values
        const SET_VALUE = 0x0002;
        /// Create subkeys
        const CREATE_SUB_KEY = 0x0004;
        /// Enumerate subkeys
        const ENUMERATE_SUB_KEYS = 0x0008;
        /// Request change notifications
        const NOTIFY = 0x0010;
        /// Reserved for system use
        const CREATE_LINK = 0x0020;
        /// Operate on the 64-bit registry view
        const WOW64_64KEY = 0x0100;
        /// Operate on the 32-bit registry view
        const WOW64_32KEY = 0x0200;
        /// Delete the key
        const DELETE = 0x0001_0000;
        /// Read the security descriptor
        const READ_CONTROL = 0x0002_0000;
        /// Modify the DACL
        const WRITE_DAC = 0x0004_0000;
        /// Change the owner
        const WRITE_OWNER = 0x0008_0000;

        /// KEY_READ
        const READ = Self::READ_CONTROL.bits()
            | Self::QUERY_VALUE.bits()
            | Self::ENUMERATE_SUB_KEYS.bits()
            | Self::NOTIFY.bits();
        /// KEY_WRITE
        const WRITE = Self::READ_CONTROL.bits()
            | Self::SET_VALUE.bits()
            | Self::CREATE_SUB_KEY.bits();
        /// KEY_EXECUTE
        const EXECUTE = Self::READ.bits();
        /// KEY_ALL_ACCESS
        const ALL_ACCESS = 0x000F_003F;
    }
}

impl Access {
    /// Rights that select a registry view rather than grant access
    pub const VIEW_FLAGS: Access = Access::WOW64_64KEY.union(Access::WOW64_32KEY);
}

impl Default for Access {
    /// `KEY_READ | KEY_WRITE`, the mask used when the caller gives none
    fn default() -> Self {
        Access::READ | Access::WRITE
    }
}

bitflags::bitflags! {
    /// Options for key creation (REG_OPTION_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CreateOptions: u32 {
        /// Key is persisted (the default)
        const NON_VOLATILE = 0x0000;
        /// Key lives in memory only and is lost when the hive unloads
        const VOLATILE = 0x0001;
        /// Key is a symbolic link
        const CREATE_LINK = 0x0002;
        /// Open with backup/restore semantics
        const BACKUP_RESTORE = 0x0004;
        /// Open the link itself rather than its target
        const OPEN_LINK = 0x0008;
        /// Exclude from registry virtualization
        const DONT_VIRTUALIZE = 0x0010;
    }
}

/// Outcome of a create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Disposition {
    /// New key was created
    CreatedNewKey = 1,
    /// Existing key was opened
    OpenedExistingKey = 2,
}

impl Disposition {
    /// Create from raw value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::CreatedNewKey),
            2 => Some(Self::OpenedExistingKey),
            _ => None,
        }
    }

    /// Interpret the disposition reported by a successful create. The key is
    /// open either way, so an unknown value is logged and taken as opened.
    pub fn from_reported(value: u32) -> Self {
        Self::from_u32(value).unwrap_or_else(|| {
            log::warn!(
                "[registry] unexpected create disposition {}, treating as opened",
                value
            );
            Self::OpenedExistingKey
        })
    }
}

/// Predefined top-level keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RootKey {
    /// HKEY_CLASSES_ROOT
    ClassesRoot = 0x8000_0000,
    /// HKEY_CURRENT_USER
    CurrentUser = 0x8000_0001,
    /// HKEY_LOCAL_MACHINE
    LocalMachine = 0x8000_0002,
    /// HKEY_USERS
    Users = 0x8000_0003,
    /// HKEY_PERFORMANCE_DATA
    PerformanceData = 0x8000_0004,
    /// HKEY_CURRENT_CONFIG
    CurrentConfig = 0x8000_0005,
}

impl RootKey {
    /// Canonical name, as shown by registry tools
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::Users => "HKEY_USERS",
            Self::PerformanceData => "HKEY_PERFORMANCE_DATA",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_masks_match_platform() {
        assert_eq!(Access::READ.bits(), 0x0002_0019);
        assert_eq!(Access::WRITE.bits(), 0x0002_0006);
        assert_eq!(Access::default().bits(), 0x0002_001F);
    }

    #[test]
    fn test_default_options_are_non_volatile() {
        assert_eq!(CreateOptions::default().bits(), 0);
        assert!(!CreateOptions::default().contains(CreateOptions::VOLATILE));
    }

    #[test]
    fn test_disposition_from_raw() {
        assert_eq!(Disposition::from_u32(1), Some(Disposition::CreatedNewKey));
        assert_eq!(Disposition::from_u32(2), Some(Disposition::OpenedExistingKey));
        assert_eq!(Disposition::from_u32(0), None);
    }

    #[test]
    fn test_reported_disposition_falls_back_to_opened() {
        assert_eq!(Disposition::from_reported(1), Disposition::CreatedNewKey);
        assert_eq!(Disposition::from_reported(2), Disposition::OpenedExistingKey);
        assert_eq!(Disposition::from_reported(7), Disposition::OpenedExistingKey);
    }
}
