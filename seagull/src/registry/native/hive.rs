//! In-Memory Registry Hive
//!
//! A process-local store implementing the native registry API with the same
//! observable behavior as the system registry:
//!
//! - **Keys** form a tree per predefined root; names are case-insensitive and
//!   case-preserving, paths are `\`-separated and create intermediate keys
//! - **Values** are named, typed byte buffers; setting replaces by name
//! - **Handles** carry the access mask they were opened with and become
//!   stale (`ERROR_KEY_DELETED`) when their key is deleted
//! - **Volatile keys** may only have volatile children
//! - **Limits** come from [`HiveConfig`]
//!
//! Keys live in a slot pool guarded by a `spin::RwLock`. A slot carries a
//! generation that is bumped on free, so a handle to a deleted key never
//! resolves to the key that later reuses the slot.
//!
//! The hive counts live handles and can inject failures into individual
//! calls, which is how the handle and enumeration contracts are exercised in
//! tests.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spin::{Mutex, RwLock};

use super::{InfoClass, KeyInfo, NativeRegistry, ValueSlot};
use crate::registry::access::{Access, CreateOptions, Disposition, RootKey};
use crate::registry::status::{
    Result, Status, StoreError, ERROR_ACCESS_DENIED, ERROR_BAD_PATHNAME,
    ERROR_CHILD_MUST_BE_VOLATILE, ERROR_FILE_NOT_FOUND, ERROR_INVALID_PARAMETER,
    ERROR_KEY_DELETED, ERROR_KEY_HAS_CHILDREN, ERROR_MORE_DATA, ERROR_NOT_ENOUGH_QUOTA,
    ERROR_NO_MORE_ITEMS, ERROR_REGISTRY_QUOTA_LIMIT,
};
use crate::registry::wide::{from_wide, wide_len};

/// Maximum key name length (UTF-16 units)
pub const MAX_KEY_NAME_LENGTH: usize = 255;

/// Maximum value name length (UTF-16 units)
pub const MAX_VALUE_NAME_LENGTH: usize = 16_383;

/// Default maximum value data size (bytes)
pub const MAX_VALUE_DATA_SIZE: usize = 1 << 20;

/// Default maximum number of keys, roots included
pub const MAX_KEYS: usize = 65_536;

const ROOTS: [RootKey; 6] = [
    RootKey::ClassesRoot,
    RootKey::CurrentUser,
    RootKey::LocalMachine,
    RootKey::Users,
    RootKey::PerformanceData,
    RootKey::CurrentConfig,
];

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct NodeFlags: u32 {
        /// Key is volatile (not persisted)
        const VOLATILE = 0x0002;
        /// Key is a predefined root
        const HIVE_ROOT = 0x0020;
    }
}

/// Limits enforced by a [`Hive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiveConfig {
    pub max_keys: usize,
    pub max_key_name_len: usize,
    pub max_value_name_len: usize,
    pub max_value_size: usize,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            max_keys: MAX_KEYS,
            max_key_name_len: MAX_KEY_NAME_LENGTH,
            max_value_name_len: MAX_VALUE_NAME_LENGTH,
            max_value_size: MAX_VALUE_DATA_SIZE,
        }
    }
}

/// Security applied to a key at creation: rights refused to later opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySecurity {
    pub deny: Access,
}

impl Default for KeySecurity {
    fn default() -> Self {
        Self::deny(Access::empty())
    }
}

impl KeySecurity {
    pub fn deny(deny: Access) -> Self {
        Self { deny }
    }
}

/// Native calls that can be made to fail with [`Hive::inject_fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    CreateKey,
    OpenKey,
    SetValue,
    QueryInfo,
    EnumKey,
    EnumValue,
    DeleteValue,
    DeleteKey,
    DeleteTree,
}

struct Fault {
    op: NativeOp,
    skip: usize,
    status: Status,
}

struct StoredValue {
    name: String,
    ty: u32,
    data: Vec<u8>,
}

struct KeyNode {
    name: String,
    parent: Option<u32>,
    subkeys: Vec<u32>,
    values: Vec<StoredValue>,
    flags: NodeFlags,
    deny: Access,
}

impl KeyNode {
    fn new(name: &str, parent: Option<u32>, flags: NodeFlags) -> Self {
        Self {
            name: String::from(name),
            parent,
            subkeys: Vec::new(),
            values: Vec::new(),
            flags,
            deny: Access::empty(),
        }
    }

    fn is_volatile(&self) -> bool {
        self.flags.contains(NodeFlags::VOLATILE)
    }

    fn is_root(&self) -> bool {
        self.flags.contains(NodeFlags::HIVE_ROOT)
    }

    fn find_value(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| names_equal(&v.name, name))
    }

    /// Replace a value of the same name, or append
    fn put_value(&mut self, value: StoredValue) {
        match self.find_value(&value.name) {
            Some(i) => self.values[i] = value,
            None => self.values.push(value),
        }
    }

    fn remove_value(&mut self, name: &str) -> bool {
        match self.find_value(name) {
            Some(i) => {
                self.values.remove(i);
                true
            }
            None => false,
        }
    }

    fn check_access(&self, access: Access) -> Result<()> {
        if self.deny.intersects(access.difference(Access::VIEW_FLAGS)) {
            return Err(StoreError::new(ERROR_ACCESS_DENIED));
        }
        Ok(())
    }
}

struct Slot {
    generation: u32,
    node: Option<KeyNode>,
}

struct KeyPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl KeyPool {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn allocate(&mut self, node: KeyNode) -> u32 {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn release(&mut self, index: u32) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                self.live -= 1;
            }
        }
    }

    fn generation(&self, index: u32) -> u32 {
        self.slots.get(index as usize).map_or(0, |s| s.generation)
    }

    fn node(&self, index: u32) -> Result<&KeyNode> {
        self.slots
            .get(index as usize)
            .and_then(|s| s.node.as_ref())
            .ok_or(StoreError::new(ERROR_KEY_DELETED))
    }

    fn node_mut(&mut self, index: u32) -> Result<&mut KeyNode> {
        self.slots
            .get_mut(index as usize)
            .and_then(|s| s.node.as_mut())
            .ok_or(StoreError::new(ERROR_KEY_DELETED))
    }

    /// Resolve a handle to its slot, rejecting handles to deleted keys
    fn resolve(&self, key: &MemoryKey) -> Result<u32> {
        match self.slots.get(key.index as usize) {
            Some(slot) if slot.generation == key.generation && slot.node.is_some() => {
                Ok(key.index)
            }
            _ => Err(StoreError::new(ERROR_KEY_DELETED)),
        }
    }

    fn find_subkey(&self, parent: u32, name: &str) -> Option<u32> {
        let node = self.node(parent).ok()?;
        node.subkeys.iter().copied().find(|&i| {
            self.node(i)
                .map(|child| names_equal(&child.name, name))
                .unwrap_or(false)
        })
    }

    /// Follow `components` from `start`; returns the deepest key reached and
    /// how many components matched
    fn walk(&self, start: u32, components: &[&str]) -> (u32, usize) {
        let mut current = start;
        for (matched, component) in components.iter().enumerate() {
            match self.find_subkey(current, component) {
                Some(next) => current = next,
                None => return (current, matched),
            }
        }
        (current, components.len())
    }

    /// Every key below `index`, children before their parents
    fn descendants(&self, index: u32) -> Vec<u32> {
        let mut order = Vec::new();
        let mut stack = vec![(index, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                if current != index {
                    order.push(current);
                }
                continue;
            }
            stack.push((current, true));
            if let Ok(node) = self.node(current) {
                stack.extend(node.subkeys.iter().map(|&child| (child, false)));
            }
        }
        order
    }

    fn unlink(&mut self, index: u32) -> Result<()> {
        let parent = self.node(index)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.subkeys.retain(|&i| i != index);
        }
        Ok(())
    }
}

struct HiveInner {
    config: HiveConfig,
    pool: RwLock<KeyPool>,
    roots: [(RootKey, u32); 6],
    open_handles: AtomicUsize,
    faults: Mutex<Vec<Fault>>,
}

impl HiveInner {
    fn take_fault(&self, op: NativeOp) -> Result<()> {
        let mut faults = self.faults.lock();
        let Some(pos) = faults.iter().position(|f| f.op == op) else {
            return Ok(());
        };
        if faults[pos].skip > 0 {
            faults[pos].skip -= 1;
            return Ok(());
        }
        let fault = faults.remove(pos);
        log::debug!("[hive] injected failure {} on {:?}", fault.status, op);
        Err(StoreError::new(fault.status))
    }

    fn check_key_names(&self, components: &[&str]) -> Result<()> {
        let too_long = components
            .iter()
            .any(|c| c.encode_utf16().count() > self.config.max_key_name_len);
        if too_long {
            return Err(StoreError::new(ERROR_INVALID_PARAMETER));
        }
        Ok(())
    }
}

/// An in-memory registry. Cloning shares the same store.
#[derive(Clone)]
pub struct Hive {
    inner: Arc<HiveInner>,
}

impl Hive {
    pub fn new() -> Self {
        Self::with_config(HiveConfig::default())
    }

    pub fn with_config(config: HiveConfig) -> Self {
        let mut pool = KeyPool::new();
        let roots = ROOTS.map(|root| {
            let node = KeyNode::new(root.name(), None, NodeFlags::HIVE_ROOT);
            (root, pool.allocate(node))
        });
        Self {
            inner: Arc::new(HiveInner {
                config,
                pool: RwLock::new(pool),
                roots,
                open_handles: AtomicUsize::new(0),
                faults: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &HiveConfig {
        &self.inner.config
    }

    /// Handle to a predefined root. Closing it is a no-op and it is not
    /// counted by [`open_handles`](Self::open_handles).
    pub fn predefined(&self, root: RootKey) -> MemoryKey {
        let index = self
            .inner
            .roots
            .iter()
            .find(|(r, _)| *r == root)
            .map_or(0, |&(_, index)| index);
        MemoryKey {
            hive: Arc::clone(&self.inner),
            index,
            generation: self.inner.pool.read().generation(index),
            access: Access::ALL_ACCESS,
            predefined: true,
        }
    }

    /// Handle to `HKEY_CURRENT_USER`, the root most callers write under
    pub fn root(&self) -> MemoryKey {
        self.predefined(RootKey::CurrentUser)
    }

    /// Number of handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    /// Number of keys, roots included
    pub fn key_count(&self) -> usize {
        self.inner.pool.read().live
    }

    /// Fail the next call of `op` with `status`
    pub fn inject_fault(&self, op: NativeOp, status: Status) {
        self.inject_fault_after(op, 0, status);
    }

    /// Let `calls` calls of `op` through, then fail the next one with `status`
    pub fn inject_fault_after(&self, op: NativeOp, calls: usize, status: Status) {
        self.inner.faults.lock().push(Fault {
            op,
            skip: calls,
            status,
        });
    }
}

impl Default for Hive {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("keys", &self.key_count())
            .field("open_handles", &self.open_handles())
            .finish()
    }
}

/// Open handle into a [`Hive`]
pub struct MemoryKey {
    hive: Arc<HiveInner>,
    index: u32,
    generation: u32,
    access: Access,
    predefined: bool,
}

impl MemoryKey {
    /// Access mask the handle was opened with
    pub fn access(&self) -> Access {
        self.access
    }

    fn require(&self, access: Access) -> Result<()> {
        if self.access.contains(access) {
            Ok(())
        } else {
            Err(StoreError::new(ERROR_ACCESS_DENIED))
        }
    }

    fn issue(&self, index: u32, generation: u32, access: Access) -> MemoryKey {
        self.hive.open_handles.fetch_add(1, Ordering::SeqCst);
        MemoryKey {
            hive: Arc::clone(&self.hive),
            index,
            generation,
            access,
            predefined: false,
        }
    }
}

impl fmt::Debug for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKey")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .field("access", &self.access)
            .field("predefined", &self.predefined)
            .finish()
    }
}

/// [`NativeRegistry`] backed by a [`Hive`]
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegistry;

impl NativeRegistry for MemoryRegistry {
    type Raw = MemoryKey;
    type Security = KeySecurity;

    fn create_key(
        parent: &MemoryKey,
        sub_key: &[u16],
        access: Access,
        options: CreateOptions,
        security: Option<&KeySecurity>,
    ) -> Result<(MemoryKey, Disposition)> {
        let hive = &parent.hive;
        hive.take_fault(NativeOp::CreateKey)?;
        let path = decode(sub_key);
        let components = split_path(&path)?;
        hive.check_key_names(&components)?;

        let mut pool = hive.pool.write();
        let start = pool.resolve(parent)?;
        let (mut current, matched) = pool.walk(start, &components);
        let missing = &components[matched..];

        if missing.is_empty() {
            pool.node(current)?.check_access(access)?;
            let generation = pool.generation(current);
            return Ok((
                parent.issue(current, generation, access),
                Disposition::OpenedExistingKey,
            ));
        }

        parent.require(Access::CREATE_SUB_KEY)?;
        let volatile = options.contains(CreateOptions::VOLATILE);
        if !volatile && pool.node(current)?.is_volatile() {
            return Err(StoreError::new(ERROR_CHILD_MUST_BE_VOLATILE));
        }
        if pool.live + missing.len() > hive.config.max_keys {
            return Err(StoreError::new(ERROR_REGISTRY_QUOTA_LIMIT));
        }

        let flags = if volatile {
            NodeFlags::VOLATILE
        } else {
            NodeFlags::empty()
        };
        for (i, name) in missing.iter().enumerate() {
            let mut node = KeyNode::new(name, Some(current), flags);
            if i + 1 == missing.len() {
                node.deny = security.map_or(Access::empty(), |s| s.deny);
            }
            let index = pool.allocate(node);
            pool.node_mut(current)?.subkeys.push(index);
            current = index;
        }
        log::debug!("[hive] created {} ({} new keys)", path, missing.len());

        let generation = pool.generation(current);
        Ok((
            parent.issue(current, generation, access),
            Disposition::CreatedNewKey,
        ))
    }

    fn open_key(parent: &MemoryKey, sub_key: &[u16], access: Access) -> Result<MemoryKey> {
        let hive = &parent.hive;
        hive.take_fault(NativeOp::OpenKey)?;
        let path = decode(sub_key);
        let components = split_path(&path)?;

        let pool = hive.pool.read();
        let start = pool.resolve(parent)?;
        let (current, matched) = pool.walk(start, &components);
        if matched != components.len() {
            return Err(StoreError::new(ERROR_FILE_NOT_FOUND));
        }
        pool.node(current)?.check_access(access)?;
        Ok(parent.issue(current, pool.generation(current), access))
    }

    fn close_key(key: &MemoryKey) -> Result<()> {
        if !key.predefined {
            key.hive.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn set_value(key: &MemoryKey, name: &[u16], ty: u32, data: &[u8]) -> Result<()> {
        let hive = &key.hive;
        hive.take_fault(NativeOp::SetValue)?;
        key.require(Access::SET_VALUE)?;
        let name_len = wide_len(name);
        if name_len > hive.config.max_value_name_len {
            return Err(StoreError::new(ERROR_INVALID_PARAMETER));
        }
        if data.len() > hive.config.max_value_size {
            return Err(StoreError::new(ERROR_NOT_ENOUGH_QUOTA));
        }

        let mut pool = hive.pool.write();
        let index = pool.resolve(key)?;
        pool.node_mut(index)?.put_value(StoredValue {
            name: from_wide(&name[..name_len]),
            ty,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn query_info(key: &MemoryKey, class: InfoClass) -> Result<KeyInfo> {
        key.hive.take_fault(NativeOp::QueryInfo)?;
        key.require(Access::QUERY_VALUE)?;
        let pool = key.hive.pool.read();
        let node = pool.node(pool.resolve(key)?)?;

        let info = match class {
            InfoClass::Subkeys => KeyInfo {
                count: node.subkeys.len() as u32,
                max_name_len: node
                    .subkeys
                    .iter()
                    .filter_map(|&i| pool.node(i).ok())
                    .map(|child| utf16_len(&child.name))
                    .max()
                    .unwrap_or(0),
                max_data_len: 0,
            },
            InfoClass::ValueNames | InfoClass::Values => KeyInfo {
                count: node.values.len() as u32,
                max_name_len: node
                    .values
                    .iter()
                    .map(|v| utf16_len(&v.name))
                    .max()
                    .unwrap_or(0),
                max_data_len: if class == InfoClass::Values {
                    node.values
                        .iter()
                        .map(|v| v.data.len() as u32)
                        .max()
                        .unwrap_or(0)
                } else {
                    0
                },
            },
        };
        Ok(info)
    }

    fn enum_key(key: &MemoryKey, index: u32, name: &mut [u16], name_len: &mut u32) -> Result<()> {
        key.hive.take_fault(NativeOp::EnumKey)?;
        key.require(Access::ENUMERATE_SUB_KEYS)?;
        let pool = key.hive.pool.read();
        let node = pool.node(pool.resolve(key)?)?;
        let child = node
            .subkeys
            .get(index as usize)
            .ok_or(StoreError::new(ERROR_NO_MORE_ITEMS))?;
        write_name(&pool.node(*child)?.name, name, name_len)
    }

    fn enum_value(
        key: &MemoryKey,
        index: u32,
        name: &mut [u16],
        name_len: &mut u32,
        slot: Option<ValueSlot<'_>>,
    ) -> Result<()> {
        key.hive.take_fault(NativeOp::EnumValue)?;
        key.require(Access::QUERY_VALUE)?;
        let pool = key.hive.pool.read();
        let node = pool.node(pool.resolve(key)?)?;
        let value = node
            .values
            .get(index as usize)
            .ok_or(StoreError::new(ERROR_NO_MORE_ITEMS))?;

        if let Some(ValueSlot { ty, data, data_len }) = slot {
            let capacity = (*data_len as usize).min(data.len());
            *ty = value.ty;
            *data_len = value.data.len() as u32;
            if value.data.len() > capacity {
                return Err(StoreError::new(ERROR_MORE_DATA));
            }
            data[..value.data.len()].copy_from_slice(&value.data);
        }
        write_name(&value.name, name, name_len)
    }

    fn delete_value(key: &MemoryKey, name: &[u16]) -> Result<()> {
        key.hive.take_fault(NativeOp::DeleteValue)?;
        key.require(Access::SET_VALUE)?;
        let name = decode(name);
        let mut pool = key.hive.pool.write();
        let index = pool.resolve(key)?;
        if pool.node_mut(index)?.remove_value(&name) {
            Ok(())
        } else {
            Err(StoreError::new(ERROR_FILE_NOT_FOUND))
        }
    }

    fn delete_key(key: &MemoryKey, sub_key: &[u16], _access: Access) -> Result<()> {
        key.hive.take_fault(NativeOp::DeleteKey)?;
        let path = decode(sub_key);
        let components = split_path(&path)?;
        if components.is_empty() {
            return Err(StoreError::new(ERROR_INVALID_PARAMETER));
        }

        let mut pool = key.hive.pool.write();
        let start = pool.resolve(key)?;
        let (target, matched) = pool.walk(start, &components);
        if matched != components.len() {
            return Err(StoreError::new(ERROR_FILE_NOT_FOUND));
        }
        let node = pool.node(target)?;
        if !node.subkeys.is_empty() {
            return Err(StoreError::new(ERROR_KEY_HAS_CHILDREN));
        }
        node.check_access(Access::DELETE)?;

        pool.unlink(target)?;
        pool.release(target);
        log::debug!("[hive] deleted {}", path);
        Ok(())
    }

    fn delete_tree(key: &MemoryKey, sub_key: &[u16]) -> Result<()> {
        key.hive.take_fault(NativeOp::DeleteTree)?;
        key.require(Access::QUERY_VALUE | Access::ENUMERATE_SUB_KEYS)?;
        let path = decode(sub_key);
        let components = split_path(&path)?;

        let mut pool = key.hive.pool.write();
        let start = pool.resolve(key)?;
        let (target, matched) = pool.walk(start, &components);
        if matched != components.len() {
            return Err(StoreError::new(ERROR_FILE_NOT_FOUND));
        }

        // Refuse before touching anything so a denial leaves the tree intact
        let doomed = pool.descendants(target);
        for &index in &doomed {
            pool.node(index)?.check_access(Access::DELETE)?;
        }
        let removes_target = !components.is_empty();
        if removes_target {
            pool.node(target)?.check_access(Access::DELETE)?;
        } else if pool.node(target)?.is_root() {
            // Predefined roots cannot be emptied wholesale
            return Err(StoreError::new(ERROR_ACCESS_DENIED));
        }

        for &index in &doomed {
            pool.release(index);
        }
        if removes_target {
            pool.unlink(target)?;
            pool.release(target);
        } else {
            let node = pool.node_mut(target)?;
            node.subkeys.clear();
            node.values.clear();
        }
        log::debug!(
            "[hive] deleted tree {} ({} keys)",
            path,
            doomed.len() + usize::from(removes_target)
        );
        Ok(())
    }
}

/// Decode a NUL-terminated name
fn decode(units: &[u16]) -> String {
    from_wide(&units[..wide_len(units)])
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Parse a registry path into components
fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.starts_with('\\') {
        return Err(StoreError::new(ERROR_BAD_PATHNAME));
    }
    Ok(path.split('\\').filter(|s| !s.is_empty()).collect())
}

fn names_equal(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Copy `src` plus a terminator into a caller buffer of `*len` units
fn write_name(src: &str, buf: &mut [u16], len: &mut u32) -> Result<()> {
    let units: Vec<u16> = src.encode_utf16().collect();
    let capacity = (*len as usize).min(buf.len());
    if units.len() + 1 > capacity {
        return Err(StoreError::new(ERROR_MORE_DATA));
    }
    buf[..units.len()].copy_from_slice(&units);
    buf[units.len()] = 0;
    *len = units.len() as u32;
    Ok(())
}
