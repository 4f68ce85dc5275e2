//! Lazy, page-at-a-time iteration over a backend scan.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use kvmount_types::{NativeKey, NativeRange};

use crate::error::StoreResult;
use crate::traits::{BackendHandle, ScanRequest};

/// Pulls scan pages from a backend only when the buffered page runs out.
///
/// After an error the cursor is finished; later calls return `None`.
pub struct ScanCursor {
    backend: Arc<dyn BackendHandle>,
    request: ScanRequest,
    buffer: VecDeque<(NativeKey, Bytes)>,
    exhausted: bool,
    pages_fetched: usize,
}

impl ScanCursor {
    pub fn new(backend: Arc<dyn BackendHandle>, range: NativeRange, page_size: usize) -> Self {
        Self {
            backend,
            request: ScanRequest::new(range).with_page_size(page_size),
            buffer: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// The next entry, fetching a new page if needed.
    pub async fn next(&mut self) -> Option<StoreResult<(NativeKey, Bytes)>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.exhausted {
                return None;
            }
            match self.backend.scan(&self.request).await {
                Ok(page) => {
                    self.pages_fetched += 1;
                    self.exhausted = page.next.is_none();
                    self.request.start_after = page.next;
                    self.buffer.extend(page.entries);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Number of pages requested from the backend so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl std::fmt::Debug for ScanCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCursor")
            .field("backend", &self.backend.name())
            .field("range", &self.request.range)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
