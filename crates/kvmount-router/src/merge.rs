//! Merged queries across every mount a key prefix touches.
//!
//! Each relevant mount is scanned by its own task, which pages through the
//! backend lazily and pushes decoded records into a bounded channel. The
//! [`MergedScan`] performs a k-way merge over the channel heads, so output is
//! globally ordered by [`Key`]. A sub-scan forwards only records whose keys
//! route to its own mount, so mounts sharing a table never see each other's
//! records.
//!
//! Ordering has a latency cost: a record can only be emitted once every live
//! sub-scan has produced its next head, so a slow backend delays keys that
//! sort after its pending result. This is a latency trade-off, not a
//! correctness problem: output order is always global key order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use bytes::Bytes;
use kvmount_schema::KeySchemaAdapter;
use kvmount_store::{ScanCursor, DEFAULT_PAGE_SIZE};
use kvmount_types::{Key, Record};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{RouterError, RouterResult};
use crate::mount::MountTable;

/// A prefix query over the whole mount table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub prefix: Key,
    /// Stop after this many records.
    pub limit: Option<usize>,
    /// Scan page size requested from each backend.
    pub page_size: usize,
}

impl Query {
    pub fn prefix(prefix: Key) -> Self {
        Self {
            prefix,
            limit: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// A query over every key in every mount.
    pub fn all() -> Self {
        Self::prefix(Key::root())
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Fans queries out to the mounts of a table.
#[derive(Debug, Clone)]
pub struct MergeQueryEngine {
    table: Arc<MountTable>,
}

impl MergeQueryEngine {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self { table }
    }

    /// Mount indices a query under `prefix` must visit, in registration
    /// order: every mount inside the prefix, plus the mount the prefix
    /// itself routes to (the only enclosing mount that can hold such keys).
    pub fn candidates(&self, prefix: &Key) -> Vec<usize> {
        let owner = self.table.route_index(prefix);
        self.table
            .mounts()
            .iter()
            .enumerate()
            .filter(|(i, m)| *i == owner || m.prefix().starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    /// Start a merged scan. Must be called from within a Tokio runtime.
    pub fn execute(&self, query: Query) -> MergedScan {
        let mut tasks = JoinSet::new();
        let mut sources = Vec::new();

        let page_size = query.page_size.max(1);
        for index in self.candidates(&query.prefix) {
            let Some(mount) = self.table.get(index) else {
                continue;
            };
            let Some(range) = mount.adapter().scan_range(&query.prefix) else {
                continue;
            };
            let (tx, rx) = mpsc::channel(page_size);
            let cursor = ScanCursor::new(mount.backend().clone(), range, page_size);
            tasks.spawn(pump(
                cursor,
                SubScan {
                    table: self.table.clone(),
                    index,
                    prefix: query.prefix.clone(),
                },
                tx,
            ));
            sources.push(rx);
        }
        debug!(prefix = %query.prefix, sources = sources.len(), limit = ?query.limit, "merged scan started");

        let pending = (0..sources.len()).collect();
        MergedScan {
            sources,
            heap: BinaryHeap::new(),
            pending,
            tasks,
            last_key: None,
            emitted: 0,
            limit: query.limit,
            done: false,
        }
    }
}

/// What one sub-scan reads: mount `index` of `table`, under `prefix`.
struct SubScan {
    table: Arc<MountTable>,
    index: usize,
    prefix: Key,
}

impl SubScan {
    fn adapter(&self) -> Option<&KeySchemaAdapter> {
        self.table.get(self.index).map(|m| m.adapter())
    }

    /// Whether `key` belongs in this sub-scan's output. A key that routes to
    /// another mount is that mount's record, stored in a shared table.
    fn owns(&self, key: &Key) -> bool {
        key.starts_with(&self.prefix) && self.table.route_index(key) == self.index
    }
}

/// Drive one sub-scan until it is exhausted, fails, or the merge goes away.
async fn pump(
    mut cursor: ScanCursor,
    scan: SubScan,
    tx: mpsc::Sender<RouterResult<Record>>,
) {
    let Some(adapter) = scan.adapter().cloned() else {
        return;
    };
    let backend = cursor.backend_name().to_string();
    debug!(%backend, mount = %adapter.prefix(), "sub-scan started");
    while let Some(entry) = cursor.next().await {
        let item = entry.map_err(RouterError::from).and_then(|(native, value)| {
            let key = adapter.decode(&native)?;
            Ok(Record { key, value })
        });
        if let Ok(record) = &item {
            if !scan.owns(&record.key) {
                if record.key.starts_with(&scan.prefix) {
                    debug!(%backend, key = %record.key, "skipping record owned by another mount");
                }
                continue;
            }
        }
        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            debug!(%backend, "sub-scan consumer dropped");
            return;
        }
        if failed {
            warn!(%backend, "sub-scan failed");
            return;
        }
    }
    debug!(%backend, pages = cursor.pages_fetched(), "sub-scan finished");
}

struct HeapEntry {
    key: Key,
    source: usize,
    value: Bytes,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// A lazily merged, key-ordered stream of records from several mounts.
///
/// Dropping the scan, calling [`cancel`](Self::cancel), reaching the limit,
/// or hitting an error aborts every outstanding sub-scan.
pub struct MergedScan {
    sources: Vec<mpsc::Receiver<RouterResult<Record>>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    /// Sources whose next head must be received before the next emission.
    pending: Vec<usize>,
    tasks: JoinSet<()>,
    last_key: Option<Key>,
    emitted: usize,
    limit: Option<usize>,
    done: bool,
}

impl MergedScan {
    /// The next record in key order, or `None` when the scan is over.
    ///
    /// Cancel-safe: dropping the returned future loses no records.
    pub async fn next(&mut self) -> Option<RouterResult<Record>> {
        loop {
            if self.done {
                return None;
            }
            if self.limit.is_some_and(|limit| self.emitted >= limit) {
                self.finish();
                return None;
            }
            while let Some(&source) = self.pending.last() {
                let received = self.sources[source].recv().await;
                self.pending.pop();
                match received {
                    Some(Ok(record)) => self.heap.push(Reverse(HeapEntry {
                        key: record.key,
                        source,
                        value: record.value,
                    })),
                    Some(Err(e)) => {
                        self.finish();
                        return Some(Err(e));
                    }
                    None => {}
                }
            }

            let Some(Reverse(entry)) = self.heap.pop() else {
                self.finish();
                return None;
            };
            self.pending.push(entry.source);

            if self.last_key.as_ref() == Some(&entry.key) {
                warn!(key = %entry.key, source = entry.source, "duplicate key across mounts; dropped");
                continue;
            }
            self.last_key = Some(entry.key.clone());
            self.emitted += 1;
            if self.limit.is_some_and(|limit| self.emitted >= limit) {
                self.finish();
            }
            return Some(Ok(Record {
                key: entry.key,
                value: entry.value,
            }));
        }
    }

    /// Drain the remaining records.
    pub async fn collect(mut self) -> RouterResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record?);
        }
        Ok(records)
    }

    /// Stop the scan and abort all sub-scans.
    pub fn cancel(&mut self) {
        self.finish();
    }

    /// Number of records emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn finish(&mut self) {
        if !self.done {
            debug!(emitted = self.emitted, "merged scan finished");
        }
        self.done = true;
        self.heap.clear();
        self.pending.clear();
        self.tasks.abort_all();
        for source in &mut self.sources {
            source.close();
        }
    }
}

impl std::fmt::Debug for MergedScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedScan")
            .field("sources", &self.sources.len())
            .field("buffered", &self.heap.len())
            .field("emitted", &self.emitted)
            .field("limit", &self.limit)
            .field("done", &self.done)
            .finish()
    }
}
