//! Registry Access
//!
//! Resource-safe access to the hierarchical key/value registry:
//!
//! - **Keys**: [`Key`] owns one open native handle and releases it on drop
//! - **Values**: typed setters, and [`Value`] read back by enumeration
//! - **Enumeration**: two-pass listing of subkeys and values
//! - **Deletion**: single values, empty keys, whole subtrees
//!
//! # Store Layout
//!
//! ```text
//! HKEY_CURRENT_USER
//! └── Software
//!     └── Seagull            <- Key
//!         ├── name  = "seagull"   (REG_SZ)
//!         ├── count = 7           (REG_DWORD)
//!         └── Plugins             <- subkey
//! ```
//!
//! # Backends
//!
//! The store is reached through [`NativeRegistry`]. [`Key`] defaults to
//! [`SystemRegistry`]: the Win32 registry on Windows, the in-memory
//! [`Hive`] elsewhere. `Key<MemoryRegistry>` always uses the hive.

pub mod access;
pub mod handle;
pub mod key;
pub mod multi_sz;
pub mod native;
pub mod operations;
pub mod status;
pub mod value;
pub mod wide;

pub use access::{Access, CreateOptions, Disposition, RootKey};

pub use handle::OwnedKey;

pub use key::Key;

pub use multi_sz::{build_multistring, split_multistring};

pub use native::{
    Hive,
    HiveConfig,
    InfoClass,
    KeyInfo,
    KeySecurity,
    MemoryKey,
    MemoryRegistry,
    NativeOp,
    NativeRegistry,
    SystemRegistry,
    ValueSlot,
};

#[cfg(windows)]
pub use native::{Hkey, Win32Registry};

pub use status::{check, ErrorKind, Result, Status, StoreError};

pub use value::{Value, ValueType};
