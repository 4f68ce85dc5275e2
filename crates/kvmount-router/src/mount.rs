//! The immutable mount table and longest-prefix selection.

use std::sync::Arc;

use kvmount_schema::KeySchemaAdapter;
use kvmount_store::BackendHandle;
use kvmount_types::{Key, SchemaShape};

use crate::error::{RouterError, RouterResult};

/// A key prefix bound to one backend and its key schema.
#[derive(Clone)]
pub struct Mount {
    adapter: KeySchemaAdapter,
    backend: Arc<dyn BackendHandle>,
}

impl Mount {
    pub fn new(adapter: KeySchemaAdapter, backend: Arc<dyn BackendHandle>) -> Self {
        Self { adapter, backend }
    }

    pub fn prefix(&self) -> &Key {
        self.adapter.prefix()
    }

    pub fn adapter(&self) -> &KeySchemaAdapter {
        &self.adapter
    }

    pub fn backend(&self) -> &Arc<dyn BackendHandle> {
        &self.backend
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("prefix", &self.prefix().to_string())
            .field("backend", &self.backend.name())
            .field("shape", &self.adapter.shape())
            .finish()
    }
}

/// Mounts in registration order, plus a lookup order for routing.
///
/// Routing walks mounts from the longest prefix to the shortest; the sort is
/// stable, so among equal prefixes the first registered mount wins.
#[derive(Debug)]
pub struct MountTable {
    mounts: Vec<Mount>,
    lookup: Vec<usize>,
    default: usize,
}

impl MountTable {
    /// Build a table. Fails unless some mount has the root prefix.
    ///
    /// Duplicate prefixes are accepted here and resolved by registration
    /// order; [`MountRouter`](crate::MountRouter) rejects them up front.
    pub fn new(mounts: Vec<Mount>) -> RouterResult<Self> {
        let default = mounts
            .iter()
            .position(|m| m.prefix().is_root())
            .ok_or_else(|| {
                RouterError::RoutingInvariant("no default mount with prefix \"/\"".into())
            })?;
        let mut lookup: Vec<usize> = (0..mounts.len()).collect();
        lookup.sort_by(|a, b| mounts[*b].prefix().len().cmp(&mounts[*a].prefix().len()));
        Ok(Self {
            mounts,
            lookup,
            default,
        })
    }

    /// Index of the mount that owns `key`.
    pub fn route_index(&self, key: &Key) -> usize {
        self.lookup
            .iter()
            .copied()
            .find(|&i| key.starts_with(self.mounts[i].prefix()))
            .unwrap_or(self.default)
    }

    pub fn route(&self, key: &Key) -> &Mount {
        &self.mounts[self.route_index(key)]
    }

    /// Mounts in registration order.
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn get(&self, index: usize) -> Option<&Mount> {
        self.mounts.get(index)
    }

    /// Two mounts reading one backend where either stores partition or sort
    /// keys; their records could not be told apart.
    pub(crate) fn first_keyed_shared_backend(&self) -> Option<(&Key, &Key)> {
        self.mounts.iter().enumerate().find_map(|(i, m)| {
            self.mounts[..i]
                .iter()
                .find(|earlier| {
                    same_backend(earlier.backend(), m.backend())
                        && (earlier.adapter().shape() != SchemaShape::Plain
                            || m.adapter().shape() != SchemaShape::Plain)
                })
                .map(|earlier| (earlier.prefix(), m.prefix()))
        })
    }

    /// The first prefix registered more than once.
    pub(crate) fn first_duplicate(&self) -> Option<&Key> {
        self.mounts.iter().enumerate().find_map(|(i, m)| {
            self.mounts[..i]
                .iter()
                .any(|earlier| earlier.prefix() == m.prefix())
                .then_some(m.prefix())
        })
    }
}

fn same_backend(a: &Arc<dyn BackendHandle>, b: &Arc<dyn BackendHandle>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
