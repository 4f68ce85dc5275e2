//! Mount routing for kvmount.
//!
//! A [`MountRouter`] owns an immutable table of mounts, each binding a key
//! prefix to one backend and that backend's key schema. Every single-key
//! operation is sent to exactly one backend, chosen by longest prefix
//! match with the root mount as the default. Queries spanning several
//! mounts are fanned out and merged in key order by the
//! [`MergeQueryEngine`].
//!
//! # Architecture
//!
//! ```text
//! caller ─▶ MountRouter::route(key) ─▶ KeySchemaAdapter::encode ─▶ BackendHandle
//!                                                                     │
//! caller ◀─ KeySchemaAdapter::decode ◀────────────────────────────────┘
//! ```
//!
//! Routers are built from a [`StoreConfig`] with [`build_router`] and an
//! injected [`Connector`](kvmount_store::Connector); there is no global
//! registry. Configuration maps are turned into a `StoreConfig` by
//! [`resolve_config`] and back by [`persist_spec`].
//!
//! # Modules
//!
//! - [`config`]: [`StoreConfig`], [`MountSpec`], validation and persistence
//! - [`resolver`]: Configuration map to [`StoreConfig`]
//! - [`mount`]: [`Mount`] and the longest-prefix [`MountTable`]
//! - [`router`]: [`MountRouter`] and [`build_router`]
//! - [`merge`]: [`MergeQueryEngine`], [`Query`] and [`MergedScan`]
//! - [`error`]: [`RouterError`] and [`ConfigValidationError`]

pub mod config;
pub mod error;
pub mod merge;
pub mod mount;
pub mod resolver;
pub mod router;

pub use config::{persist_spec, persist_spec_redacted, Layout, MountSpec, StoreConfig};
pub use error::{ConfigValidationError, RouterError, RouterResult};
pub use merge::{MergeQueryEngine, MergedScan, Query};
pub use mount::{Mount, MountTable};
pub use resolver::resolve_config;
pub use router::{build_router, MountRouter};
