//! Scoped native key handle.

use core::fmt;

use super::native::NativeRegistry;

/// Owns one open native handle and closes it when dropped
pub struct OwnedKey<N: NativeRegistry> {
    raw: N::Raw,
}

impl<N: NativeRegistry> OwnedKey<N> {
    /// Take ownership of a freshly opened handle
    pub fn new(raw: N::Raw) -> Self {
        Self { raw }
    }

    pub fn get(&self) -> &N::Raw {
        &self.raw
    }
}

impl<N: NativeRegistry> Drop for OwnedKey<N> {
    fn drop(&mut self) {
        match N::close_key(&self.raw) {
            Ok(()) => log::debug!("[registry] released key handle"),
            // Nothing to propagate to from here
            Err(e) => log::warn!("[registry] failed to close key handle: {}", e),
        }
    }
}

impl<N: NativeRegistry> fmt::Debug for OwnedKey<N>
where
    N::Raw: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedKey").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::access::{Access, CreateOptions};
    use crate::registry::native::{Hive, MemoryRegistry};
    use crate::registry::wide::to_wide_nul;

    #[test]
    fn test_drop_closes_handle() {
        let hive = Hive::new();
        let (raw, _) = MemoryRegistry::create_key(
            &hive.root(),
            &to_wide_nul("Scoped").unwrap(),
            Access::default(),
            CreateOptions::default(),
            None,
        )
        .unwrap();

        let owned = OwnedKey::<MemoryRegistry>::new(raw);
        assert_eq!(hive.open_handles(), 1);
        drop(owned);
        assert_eq!(hive.open_handles(), 0);
    }
}
