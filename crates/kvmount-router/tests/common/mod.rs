//! Helpers shared by the router integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kvmount_router::{build_router, MountRouter, StoreConfig};
use kvmount_store::{
    BackendHandle, ConnectionConfig, MemoryBackend, MemoryConnector, ScanPage, ScanRequest,
    StoreError, StoreResult,
};
use kvmount_types::{Key, NativeKey};
use tokio::sync::Semaphore;

pub fn key(s: &str) -> Key {
    Key::parse(s).unwrap()
}

pub fn connection() -> ConnectionConfig {
    ConnectionConfig {
        access_key: "AK".into(),
        secret_key: "SK".into(),
        region: "us-east-1".into(),
        endpoint: "http://localhost:8000".into(),
    }
}

pub fn scenario() -> (MountRouter, MemoryConnector) {
    let connector = MemoryConnector::new();
    let config = StoreConfig::standard(connection(), "providers", "pins", "default");
    let router = build_router(&config, &connector).unwrap();
    (router, connector)
}

/// A backend whose reads wait for permits on a gate.
pub struct GatedBackend {
    pub inner: MemoryBackend,
    pub gate: Arc<Semaphore>,
}

impl GatedBackend {
    /// A backend named `name` whose reads block until permits are added.
    pub fn closed(name: &str) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            inner: MemoryBackend::new(name),
            gate: gate.clone(),
        };
        (backend, gate)
    }

    async fn wait(&self) -> StoreResult<()> {
        let permit = self.gate.acquire().await.map_err(|e| StoreError::Unavailable {
            backend: self.inner.name().to_string(),
            reason: e.to_string(),
        })?;
        permit.forget();
        Ok(())
    }
}

#[async_trait]
impl BackendHandle for GatedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &NativeKey) -> StoreResult<Bytes> {
        self.wait().await?;
        self.inner.get(key).await
    }

    async fn put(&self, key: NativeKey, value: Bytes) -> StoreResult<()> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &NativeKey) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn has(&self, key: &NativeKey) -> StoreResult<bool> {
        self.inner.has(key).await
    }

    async fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage> {
        self.wait().await?;
        self.inner.scan(request).await
    }
}
