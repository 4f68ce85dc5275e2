mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::{connection, key, scenario, GatedBackend};
use kvmount_router::{build_router, Mount, MountRouter, MountSpec, Query, StoreConfig};
use kvmount_schema::KeySchemaAdapter;
use kvmount_store::{
    BackendHandle, MemoryBackend, MemoryConnector, ScanPage, ScanRequest, StoreError, StoreResult,
};
use kvmount_types::{KeySchema, NativeKey, Record};

fn keys(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.key.to_string()).collect()
}

fn mount(prefix: &str, schema: KeySchema, backend: Arc<dyn BackendHandle>) -> Mount {
    Mount::new(KeySchemaAdapter::new(key(prefix), schema).unwrap(), backend)
}

async fn wait_for(counter: &AtomicUsize, at_least: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < at_least {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("counter never reached its target");
}

/// Increments a counter when dropped.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A backend whose scans never complete.
#[derive(Default)]
struct StuckBackend {
    started: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

#[async_trait]
impl BackendHandle for StuckBackend {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn get(&self, key: &NativeKey) -> StoreResult<Bytes> {
        Err(StoreError::not_found(key))
    }

    async fn put(&self, _key: NativeKey, _value: Bytes) -> StoreResult<()> {
        Ok(())
    }

    async fn delete(&self, key: &NativeKey) -> StoreResult<()> {
        Err(StoreError::not_found(key))
    }

    async fn has(&self, _key: &NativeKey) -> StoreResult<bool> {
        Ok(false)
    }

    async fn scan(&self, _request: &ScanRequest) -> StoreResult<ScanPage> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _guard = DropGuard(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(ScanPage {
            entries: Vec::new(),
            next: None,
        })
    }
}

fn stuck_router() -> (MountRouter, Arc<StuckBackend>) {
    let stuck = Arc::new(StuckBackend::default());
    let router = MountRouter::new(vec![
        mount("/stuck", KeySchema::plain(), stuck.clone()),
        mount("/", KeySchema::plain(), Arc::new(MemoryBackend::new("root"))),
    ])
    .unwrap();
    (router, stuck)
}

// ---------------------------------------------------------------------------
// Ordering and selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_space_query_is_the_sorted_union() {
    let (router, _connector) = scenario();
    for k in [
        "/providers/h1/p1",
        "/other",
        "/pins/h2",
        "/providers/h0/p9",
        "/a",
        "/pins/h1",
        "/providers/h1/p0",
    ] {
        router.put(&key(k), Bytes::from(k.to_string())).await.unwrap();
    }

    let records = router.query(Query::all()).collect().await.unwrap();
    assert_eq!(
        keys(&records),
        vec![
            "/a",
            "/other",
            "/pins/h1",
            "/pins/h2",
            "/providers/h0/p9",
            "/providers/h1/p0",
            "/providers/h1/p1",
        ]
    );
    for record in &records {
        assert_eq!(record.value, record.key.to_string().as_bytes());
    }
}

#[tokio::test]
async fn small_pages_give_the_same_result() {
    let (router, _connector) = scenario();
    for i in 0..20 {
        router.put(&key(&format!("/pins/h{i:02}")), Bytes::new()).await.unwrap();
        router.put(&key(&format!("/providers/h{i:02}/p")), Bytes::new()).await.unwrap();
        router.put(&key(&format!("/z{i:02}")), Bytes::new()).await.unwrap();
    }

    let paged = router.query(Query::all().with_page_size(3)).collect().await.unwrap();
    let whole = router.query(Query::all()).collect().await.unwrap();
    assert_eq!(paged.len(), 60);
    assert_eq!(keys(&paged), keys(&whole));
    assert!(paged.windows(2).all(|w| w[0].key < w[1].key));
}

#[tokio::test]
async fn prefix_query_selects_one_subtree() {
    let (router, _connector) = scenario();
    for k in ["/pins/h1", "/pins/h2", "/pinsx/h3", "/providers/h1/p1", "/providers/h10/p1", "/providers/h1/p2"] {
        router.put(&key(k), Bytes::new()).await.unwrap();
    }

    let pins = router.query(Query::prefix(key("/pins"))).collect().await.unwrap();
    assert_eq!(keys(&pins), vec!["/pins/h1", "/pins/h2"]);

    let h1 = router
        .query(Query::prefix(key("/providers/h1")))
        .collect()
        .await
        .unwrap();
    assert_eq!(keys(&h1), vec!["/providers/h1/p1", "/providers/h1/p2"]);

    let nothing = router.query(Query::prefix(key("/p"))).collect().await.unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn nested_mounts_merge_with_their_parent() {
    let outer = Arc::new(MemoryBackend::new("outer"));
    let inner = Arc::new(MemoryBackend::new("inner"));
    let router = MountRouter::new(vec![
        mount("/", KeySchema::plain(), outer),
        mount("/a/b", KeySchema::partition("Id"), inner),
    ])
    .unwrap();
    for k in ["/a/c", "/a/b/x", "/a/a", "/a/b/y", "/b"] {
        router.put(&key(k), Bytes::new()).await.unwrap();
    }

    let records = router.query(Query::prefix(key("/a"))).collect().await.unwrap();
    assert_eq!(keys(&records), vec!["/a/a", "/a/b/x", "/a/b/y", "/a/c"]);
}

#[tokio::test]
async fn mounts_sharing_a_table_each_list_their_own_records() {
    let config = StoreConfig::explicit(
        connection(),
        vec![
            MountSpec::new("/blocks", "shared", KeySchema::plain()),
            MountSpec::new("/", "shared", KeySchema::plain()),
        ],
    );
    let connector = MemoryConnector::new();
    let router = build_router(&config, &connector).unwrap();
    for k in ["/blocks/b2", "/a", "/blocks/b1", "/z"] {
        router.put(&key(k), Bytes::new()).await.unwrap();
    }

    let all = router.query(Query::all()).collect().await.unwrap();
    assert_eq!(keys(&all), vec!["/a", "/blocks/b1", "/blocks/b2", "/z"]);

    let blocks = router.query(Query::prefix(key("/blocks"))).collect().await.unwrap();
    assert_eq!(keys(&blocks), vec!["/blocks/b1", "/blocks/b2"]);
}

// ---------------------------------------------------------------------------
// Limits, errors and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn limit_stops_early() {
    let root = Arc::new(MemoryBackend::new("root"));
    let router = MountRouter::new(vec![mount("/", KeySchema::plain(), root.clone())]).unwrap();
    for i in 0..100 {
        router.put(&key(&format!("/k{i:03}")), Bytes::new()).await.unwrap();
    }

    let mut scan = router.query(Query::all().with_limit(3).with_page_size(1));
    let mut seen = Vec::new();
    while let Some(record) = scan.next().await {
        seen.push(record.unwrap().key.to_string());
    }
    assert_eq!(seen, vec!["/k000", "/k001", "/k002"]);
    assert!(scan.is_done());
    assert_eq!(scan.emitted(), 3);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let served = root.scan_pages_served();
    assert!(served < 20, "sub-scan kept paging after the limit: {served} pages");
}

#[tokio::test]
async fn zero_limit_emits_nothing() {
    let (router, _connector) = scenario();
    router.put(&key("/other"), Bytes::new()).await.unwrap();
    let records = router.query(Query::all().with_limit(0)).collect().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn sub_scan_failure_surfaces_and_ends_the_scan() {
    let (router, connector) = scenario();
    router.put(&key("/other"), Bytes::new()).await.unwrap();
    connector.backend("pins").unwrap().set_offline(true);

    let mut scan = router.query(Query::all());
    let mut failure = None;
    while let Some(item) = scan.next().await {
        if let Err(e) = item {
            failure = Some(e);
        }
    }
    let err = failure.expect("offline mount must fail the scan");
    assert!(err.is_unavailable(), "got: {err}");
    assert!(scan.next().await.is_none());
}

#[tokio::test]
async fn cancel_aborts_sub_scans() {
    let (router, stuck) = stuck_router();
    let mut scan = router.query(Query::all());
    wait_for(&stuck.started, 1).await;

    scan.cancel();
    wait_for(&stuck.dropped, 1).await;
    assert!(scan.next().await.is_none());
}

#[tokio::test]
async fn dropping_the_scan_aborts_sub_scans() {
    let (router, stuck) = stuck_router();
    let scan = router.query(Query::all());
    wait_for(&stuck.started, 1).await;

    drop(scan);
    wait_for(&stuck.dropped, 1).await;
}

// ---------------------------------------------------------------------------
// Latency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_mount_delays_but_never_reorders() {
    let (slow, gate) = GatedBackend::closed("slow");
    let slow = Arc::new(slow);
    let fast = Arc::new(MemoryBackend::new("fast"));
    let router = MountRouter::new(vec![
        mount("/m", KeySchema::partition("Id"), slow),
        mount("/", KeySchema::plain(), fast),
    ])
    .unwrap();
    for k in ["/a", "/m/1", "/m/2", "/z"] {
        router.put(&key(k), Bytes::new()).await.unwrap();
    }

    let mut scan = router.query(Query::all());
    // Nothing can be emitted while the slow mount's head is unknown.
    let early = tokio::time::timeout(Duration::from_millis(50), scan.next()).await;
    assert!(early.is_err());

    gate.add_permits(16);
    let mut seen = Vec::new();
    while let Some(record) = scan.next().await {
        seen.push(record.unwrap().key.to_string());
    }
    assert_eq!(seen, vec!["/a", "/m/1", "/m/2", "/z"]);
}

#[tokio::test]
async fn queries_do_not_block_point_operations() {
    let (router, stuck) = stuck_router();
    router.put(&key("/x"), &b"x"[..]).await.unwrap();

    let _scan = router.query(Query::all());
    wait_for(&stuck.started, 1).await;

    let value = tokio::time::timeout(Duration::from_secs(1), router.get(&key("/x")))
        .await
        .expect("point read must not wait on a stuck scan")
        .unwrap();
    assert_eq!(value, &b"x"[..]);
}
