use async_trait::async_trait;
use bytes::Bytes;
use kvmount_types::{NativeKey, NativeRange};

use crate::error::StoreResult;

/// Default number of entries requested per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 128;

/// One page request of a backend scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    /// Which native keys to list.
    pub range: NativeRange,
    /// Resume strictly after this key (the previous page's `next`).
    pub start_after: Option<NativeKey>,
    /// Upper bound on entries returned in this page.
    pub page_size: usize,
}

impl ScanRequest {
    pub fn new(range: NativeRange) -> Self {
        Self {
            range,
            start_after: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// One page of scan results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Entries in ascending native-key order.
    pub entries: Vec<(NativeKey, Bytes)>,
    /// Continuation token: pass as `start_after` to fetch the next page.
    /// `None` when the scan is exhausted.
    pub next: Option<NativeKey>,
}

/// Uniform capability over one physical store.
///
/// All implementations must satisfy these invariants:
/// - `get` and `delete` on an absent key return [`StoreError::NotFound`];
///   callers treat it as an ordinary outcome.
/// - `scan` pages are in ascending [`NativeKey`] order and never repeat an
///   entry across pages of the same scan.
/// - Connector failures are reported as [`StoreError::Unavailable`] and are
///   not retried here.
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
/// [`StoreError::Unavailable`]: crate::StoreError::Unavailable
#[async_trait]
pub trait BackendHandle: Send + Sync {
    /// Identifier of the physical store (e.g. a table name).
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    async fn get(&self, key: &NativeKey) -> StoreResult<Bytes>;

    /// Create or overwrite the value stored under `key`.
    async fn put(&self, key: NativeKey, value: Bytes) -> StoreResult<()>;

    /// Remove `key`.
    async fn delete(&self, key: &NativeKey) -> StoreResult<()>;

    /// Check whether `key` is stored.
    async fn has(&self, key: &NativeKey) -> StoreResult<bool>;

    /// Fetch one page of a scan.
    async fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage>;

    /// Whether [`put_batch`](Self::put_batch) is a native bulk write.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Write multiple entries.
    ///
    /// Default implementation calls `put()` for each entry. Backends may
    /// override with a bulk write; it still need not be atomic.
    async fn put_batch(&self, entries: Vec<(NativeKey, Bytes)>) -> StoreResult<()> {
        for (key, value) in entries {
            self.put(key, value).await?;
        }
        Ok(())
    }
}
