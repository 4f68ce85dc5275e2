//! In-memory backend for tests and embedding.
//!
//! [`MemoryBackend`] keeps entries in a `BTreeMap` behind a `RwLock`, so
//! scans come out in native-key order for free. It also implements the
//! optional batch write and can be switched offline to exercise
//! [`StoreError::Unavailable`] paths.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use kvmount_types::NativeKey;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BackendHandle, ScanPage, ScanRequest};

/// An in-memory implementation of [`BackendHandle`].
pub struct MemoryBackend {
    name: String,
    entries: RwLock<BTreeMap<NativeKey, Bytes>>,
    offline: AtomicBool,
    scan_pages: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            scan_pages: AtomicUsize::new(0),
        }
    }

    /// When offline, every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.read_entries().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct lookup by native key, bypassing the async contract.
    pub fn get_native(&self, key: &NativeKey) -> Option<Bytes> {
        self.read_entries().ok()?.get(key).cloned()
    }

    /// All stored native keys in order.
    pub fn native_keys(&self) -> Vec<NativeKey> {
        self.read_entries()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of scan pages served so far.
    pub fn scan_pages_served(&self) -> usize {
        self.scan_pages.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                backend: self.name.clone(),
                reason: "backend is offline".into(),
            });
        }
        Ok(())
    }

    fn read_entries(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<NativeKey, Bytes>>> {
        self.entries.read().map_err(|e| StoreError::Unavailable {
            backend: self.name.clone(),
            reason: format!("lock poisoned: {e}"),
        })
    }

    fn write_entries(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<NativeKey, Bytes>>> {
        self.entries.write().map_err(|e| StoreError::Unavailable {
            backend: self.name.clone(),
            reason: format!("lock poisoned: {e}"),
        })
    }
}

#[async_trait]
impl BackendHandle for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &NativeKey) -> StoreResult<Bytes> {
        self.check_online()?;
        self.read_entries()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn put(&self, key: NativeKey, value: Bytes) -> StoreResult<()> {
        self.check_online()?;
        self.write_entries()?.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &NativeKey) -> StoreResult<()> {
        self.check_online()?;
        match self.write_entries()?.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(key)),
        }
    }

    async fn has(&self, key: &NativeKey) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.read_entries()?.contains_key(key))
    }

    async fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage> {
        self.check_online()?;
        if request.page_size == 0 {
            return Err(StoreError::InvalidRequest("page size must be positive".into()));
        }
        self.scan_pages.fetch_add(1, Ordering::SeqCst);

        let entries = self.read_entries()?;
        let lower = match &request.start_after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut matching = entries
            .range::<NativeKey, _>((lower, Bound::Unbounded))
            .filter(|(key, _)| request.range.contains(key));

        let page: Vec<(NativeKey, Bytes)> = matching
            .by_ref()
            .take(request.page_size)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let next = if matching.next().is_some() {
            page.last().map(|(k, _)| k.clone())
        } else {
            None
        };
        Ok(ScanPage {
            entries: page,
            next,
        })
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn put_batch(&self, batch: Vec<(NativeKey, Bytes)>) -> StoreResult<()> {
        self.check_online()?;
        self.write_entries()?.extend(batch);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("name", &self.name)
            .field("entry_count", &self.len())
            .finish()
    }
}
