//! The [`MountRouter`]: single-key operations dispatched by longest prefix.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use kvmount_schema::KeySchemaAdapter;
use kvmount_store::{Connector, TableSpec};
use kvmount_types::{Key, NativeKey, Record};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{RouterError, RouterResult};
use crate::merge::{MergeQueryEngine, MergedScan, Query};
use crate::mount::{Mount, MountTable};

/// Routes every key to exactly one backend.
///
/// The mount table is immutable and shared, so cloning a router is cheap
/// and routing never takes a lock. Each operation touches only the backend
/// its key routes to.
#[derive(Debug, Clone)]
pub struct MountRouter {
    table: Arc<MountTable>,
}

impl MountRouter {
    /// Build a router over `mounts`, in registration order.
    ///
    /// Fails with [`RouterError::RoutingInvariant`] if no mount has the root
    /// prefix, if two mounts share a prefix, or if mounts share a backend
    /// while either of them uses partition or sort keys.
    pub fn new(mounts: Vec<Mount>) -> RouterResult<Self> {
        let table = MountTable::new(mounts)?;
        if let Some(prefix) = table.first_duplicate() {
            return Err(RouterError::RoutingInvariant(format!(
                "mount prefix {prefix} is registered more than once"
            )));
        }
        if let Some((first, second)) = table.first_keyed_shared_backend() {
            return Err(RouterError::RoutingInvariant(format!(
                "mounts {first} and {second} share a backend but not a plain key schema"
            )));
        }
        Ok(Self {
            table: Arc::new(table),
        })
    }

    /// The mount owning `key`: the longest prefix match, else the default.
    pub fn route(&self, key: &Key) -> &Mount {
        self.table.route(key)
    }

    /// Mounts in registration order.
    pub fn mounts(&self) -> &[Mount] {
        self.table.mounts()
    }

    fn encode<'a>(&'a self, key: &Key) -> RouterResult<(&'a Mount, NativeKey)> {
        let mount = self.table.route(key);
        let native = mount.adapter().encode(key)?;
        debug!(%key, mount = %mount.prefix(), backend = mount.backend().name(), native = %native, "routed");
        Ok((mount, native))
    }

    pub async fn get(&self, key: &Key) -> RouterResult<Bytes> {
        let (mount, native) = self.encode(key)?;
        Ok(mount.backend().get(&native).await?)
    }

    pub async fn put(&self, key: &Key, value: impl Into<Bytes>) -> RouterResult<()> {
        let (mount, native) = self.encode(key)?;
        Ok(mount.backend().put(native, value.into()).await?)
    }

    pub async fn delete(&self, key: &Key) -> RouterResult<()> {
        let (mount, native) = self.encode(key)?;
        Ok(mount.backend().delete(&native).await?)
    }

    pub async fn has(&self, key: &Key) -> RouterResult<bool> {
        let (mount, native) = self.encode(key)?;
        Ok(mount.backend().has(&native).await?)
    }

    /// Write many records, batching per backend where supported.
    ///
    /// Every key is encoded before anything is written, so a malformed key
    /// fails the call without side effects. Writes to different mounts are
    /// independent: on a backend failure, earlier mounts stay written and
    /// nothing is rolled back.
    pub async fn put_many(&self, records: Vec<Record>) -> RouterResult<()> {
        let mut groups: BTreeMap<usize, Vec<(NativeKey, Bytes)>> = BTreeMap::new();
        for record in records {
            let index = self.table.route_index(&record.key);
            let mount = &self.table.mounts()[index];
            let native = mount.adapter().encode(&record.key)?;
            groups.entry(index).or_default().push((native, record.value));
        }

        for (index, entries) in groups {
            let backend = self.table.mounts()[index].backend();
            debug!(backend = backend.name(), count = entries.len(), batched = backend.supports_batch(), "writing group");
            if backend.supports_batch() {
                backend.put_batch(entries).await?;
            } else {
                for (native, value) in entries {
                    backend.put(native, value).await?;
                }
            }
        }
        Ok(())
    }

    /// Start a merged, key-ordered scan over every mount `query` touches.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn query(&self, query: Query) -> MergedScan {
        self.engine().execute(query)
    }

    /// A query engine over this router's mount table.
    pub fn engine(&self) -> MergeQueryEngine {
        MergeQueryEngine::new(self.table.clone())
    }
}

/// Validate `config` and open one backend per mount through `connector`.
///
/// Validation runs to completion before the connector is called, so a bad
/// configuration never opens a connection.
pub fn build_router(config: &StoreConfig, connector: &dyn Connector) -> RouterResult<MountRouter> {
    config.validate()?;

    let mut mounts = Vec::with_capacity(config.mounts.len());
    for spec in &config.mounts {
        let prefix = Key::parse(&spec.prefix)?;
        let adapter = KeySchemaAdapter::new(prefix, spec.schema.clone())?;
        let backend = connector.open(
            &config.connection,
            &TableSpec {
                table: spec.table.clone(),
                schema: spec.schema.clone(),
            },
        )?;
        mounts.push(Mount::new(adapter, backend));
    }

    let router = MountRouter::new(mounts)?;
    info!(mounts = router.mounts().len(), region = %config.connection.region, "router built");
    Ok(router)
}
