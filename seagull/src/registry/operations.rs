//! Key Operations
//!
//! Typed setters, enumeration and deletion on an open [`Key`].
//!
//! # Enumeration
//!
//! Listing is two-pass: the key's metadata gives the child count and the
//! longest name (and data), one scratch buffer of that size plus a terminator
//! is allocated, and every index is fetched into it. The in/out length is
//! reset to the full capacity before each call, since the store overwrites it
//! with the length of the entry it returned. Any failure fails the whole
//! listing.

use super::access::Access;
use super::key::Key;
use super::multi_sz::build_multistring;
use super::native::{InfoClass, NativeRegistry, ValueSlot};
use super::status::{Result, StoreError, ERROR_INVALID_PARAMETER};
use super::value::{Value, ValueType};
use super::wide::{from_wide, to_wide_nul, units_to_bytes};

/// Scratch capacity for names of up to `max_len` units, terminator included
fn name_capacity(max_len: u32) -> Result<u32> {
    max_len
        .checked_add(1)
        .ok_or(StoreError::new(ERROR_INVALID_PARAMETER))
}

/// Text plus one terminator, as string values are stored
fn string_bytes(value: &str) -> Vec<u8> {
    let mut units: Vec<u16> = value.encode_utf16().collect();
    units.push(0);
    units_to_bytes(&units)
}

impl<N: NativeRegistry> Key<N> {
    fn set_raw(&self, name: &str, ty: ValueType, data: &[u8]) -> Result<()> {
        let raw = self.raw()?;
        let name = to_wide_nul(name)?;
        N::set_value(raw, &name, ty.as_u32(), data)
    }

    pub fn set_dword_value(&self, name: &str, value: u32) -> Result<()> {
        self.set_raw(name, ValueType::Dword, &value.to_ne_bytes())
    }

    pub fn set_qword_value(&self, name: &str, value: u64) -> Result<()> {
        self.set_raw(name, ValueType::Qword, &value.to_ne_bytes())
    }

    pub fn set_string_value(&self, name: &str, value: &str) -> Result<()> {
        self.set_raw(name, ValueType::Sz, &string_bytes(value))
    }

    /// Store a REG_EXPAND_SZ. `%VARIABLE%` references are kept verbatim.
    pub fn set_expanded_string_value(&self, name: &str, value: &str) -> Result<()> {
        self.set_raw(name, ValueType::ExpandSz, &string_bytes(value))
    }

    pub fn set_multistring_value<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<()> {
        let units = build_multistring(values);
        self.set_raw(name, ValueType::MultiSz, &units_to_bytes(&units))
    }

    pub fn set_binary_value(&self, name: &str, value: impl AsRef<[u8]>) -> Result<()> {
        self.set_raw(name, ValueType::Binary, value.as_ref())
    }

    /// Names of the direct subkeys, in enumeration order
    pub fn enum_subkeys(&self) -> Result<Vec<String>> {
        let raw = self.raw()?;
        let info = N::query_info(raw, InfoClass::Subkeys)?;
        let capacity = name_capacity(info.max_name_len)?;
        let mut name = vec![0u16; capacity as usize];

        let mut subkeys = Vec::with_capacity(info.count as usize);
        for index in 0..info.count {
            let mut len = capacity;
            N::enum_key(raw, index, &mut name, &mut len)?;
            let subkey = from_wide(&name[..(len as usize).min(name.len())]);
            log::trace!("[registry] subkey {}: {}", index, subkey);
            subkeys.push(subkey);
        }
        Ok(subkeys)
    }

    /// Names and data of all values, in enumeration order
    pub fn enum_values(&self) -> Result<Vec<(String, Value)>> {
        let raw = self.raw()?;
        let info = N::query_info(raw, InfoClass::Values)?;
        let capacity = name_capacity(info.max_name_len)?;
        let mut name = vec![0u16; capacity as usize];
        let mut data = vec![0u8; info.max_data_len as usize];

        let mut values = Vec::with_capacity(info.count as usize);
        for index in 0..info.count {
            let mut len = capacity;
            let mut ty = 0u32;
            let mut data_len = info.max_data_len;
            N::enum_value(
                raw,
                index,
                &mut name,
                &mut len,
                Some(ValueSlot {
                    ty: &mut ty,
                    data: &mut data,
                    data_len: &mut data_len,
                }),
            )?;

            let value_name = from_wide(&name[..(len as usize).min(name.len())]);
            let value = Value::new(
                ValueType::from_u32(ty),
                &data[..(data_len as usize).min(data.len())],
            );
            log::trace!("[registry] value {}: {} {:?}", index, value_name, value);
            values.push((value_name, value));
        }
        Ok(values)
    }

    /// Names of all values, without fetching their data
    pub fn enum_value_names(&self) -> Result<Vec<String>> {
        let raw = self.raw()?;
        let info = N::query_info(raw, InfoClass::ValueNames)?;
        let capacity = name_capacity(info.max_name_len)?;
        let mut name = vec![0u16; capacity as usize];

        let mut names = Vec::with_capacity(info.count as usize);
        for index in 0..info.count {
            let mut len = capacity;
            N::enum_value(raw, index, &mut name, &mut len, None)?;
            let value_name = from_wide(&name[..(len as usize).min(name.len())]);
            log::trace!("[registry] value name {}: {}", index, value_name);
            names.push(value_name);
        }
        Ok(names)
    }

    pub fn delete_value(&self, name: &str) -> Result<()> {
        let raw = self.raw()?;
        N::delete_value(raw, &to_wide_nul(name)?)?;
        log::debug!("[registry] deleted value {}", name);
        Ok(())
    }

    /// Delete one subkey that has no subkeys of its own.
    ///
    /// Only the registry view bits of `access` are used.
    pub fn delete_key(&self, sub_key: &str, access: Access) -> Result<()> {
        let raw = self.raw()?;
        N::delete_key(raw, &to_wide_nul(sub_key)?, access)?;
        log::debug!("[registry] deleted key {}", sub_key);
        Ok(())
    }

    /// Delete a subkey with everything below it. An empty `sub_key` empties
    /// this key instead, keeping the key itself.
    pub fn delete_tree(&self, sub_key: &str) -> Result<()> {
        let raw = self.raw()?;
        N::delete_tree(raw, &to_wide_nul(sub_key)?)?;
        log::debug!("[registry] deleted tree {}", sub_key);
        Ok(())
    }
}
