//! Connectors open backend handles for configured tables.
//!
//! Session and credential setup for a remote store is the connector's job;
//! the router only ever sees the resulting [`BackendHandle`]s.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use kvmount_types::KeySchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryBackend;
use crate::traits::BackendHandle;

/// Connection parameters for a remote composite-key store.
///
/// These are consumed by connectors only; routing never reads them.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub endpoint: String,
}

impl ConnectionConfig {
    /// Static credentials are used only when both halves are present.
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// A table to open, with the key schema it was declared with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table: String,
    pub schema: KeySchema,
}

/// Opens backend handles. Injected into router construction.
pub trait Connector: Send + Sync {
    fn open(&self, connection: &ConnectionConfig, table: &TableSpec)
        -> StoreResult<Arc<dyn BackendHandle>>;
}

/// In-memory connector: one [`MemoryBackend`] per table name.
///
/// Mounts that name the same table share one backend, as they would share
/// one remote table.
#[derive(Default)]
pub struct MemoryConnector {
    tables: RwLock<HashMap<String, Arc<MemoryBackend>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend opened for `table`, if any.
    pub fn backend(&self, table: &str) -> Option<Arc<MemoryBackend>> {
        self.tables.read().ok()?.get(table).cloned()
    }

    /// Number of distinct tables opened so far.
    pub fn opened(&self) -> usize {
        self.tables.read().map(|t| t.len()).unwrap_or(0)
    }
}

impl Connector for MemoryConnector {
    fn open(
        &self,
        _connection: &ConnectionConfig,
        table: &TableSpec,
    ) -> StoreResult<Arc<dyn BackendHandle>> {
        let mut tables = self.tables.write().map_err(|e| StoreError::Unavailable {
            backend: table.table.clone(),
            reason: format!("lock poisoned: {e}"),
        })?;
        let backend = tables
            .entry(table.table.clone())
            .or_insert_with(|| {
                debug!(table = %table.table, "opening in-memory table");
                Arc::new(MemoryBackend::new(table.table.clone()))
            })
            .clone();
        Ok(backend)
    }
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("tables", &self.opened())
            .finish()
    }
}
