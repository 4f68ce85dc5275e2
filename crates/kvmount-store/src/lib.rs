//! Backend contract for kvmount.
//!
//! Every physical store, whatever its vendor or key layout, is reached
//! through the [`BackendHandle`] trait: `get`, `put`, `delete`, `has` and a
//! paged `scan`. Keys at this layer are already encoded [`NativeKey`]s;
//! translating hierarchical keys is the schema adapter's job.
//!
//! # Storage Backends
//!
//! - [`MemoryBackend`] -- `BTreeMap`-based backend for tests and embedding
//!
//! Remote stores are opened by a [`Connector`]; [`MemoryConnector`] is the
//! in-memory stand-in used by tests.
//!
//! # Design Rules
//!
//! 1. Absent keys are a normal outcome ([`StoreError::NotFound`]), never a panic.
//! 2. Scans are paged and lazy; [`ScanCursor`] only fetches when drained.
//! 3. Connector failures surface as [`StoreError::Unavailable`], unretried.
//! 4. Batch writes are optional and never atomic across backends.
//!
//! [`NativeKey`]: kvmount_types::NativeKey

pub mod connector;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod traits;

pub use connector::{ConnectionConfig, Connector, MemoryConnector, TableSpec};
pub use cursor::ScanCursor;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use traits::{BackendHandle, ScanPage, ScanRequest, DEFAULT_PAGE_SIZE};
