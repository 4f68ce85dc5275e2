//! Key schema translation for kvmount.
//!
//! Each mount declares how its backend lays out primary keys: a single
//! attribute holding the whole key, a partition key, or a partition + sort
//! key pair. A [`KeySchemaAdapter`] converts between the caller's
//! hierarchical [`Key`](kvmount_types::Key) and the backend's
//! [`NativeKey`](kvmount_types::NativeKey), and maps query prefixes onto
//! native scan ranges.
//!
//! # Modules
//!
//! - [`adapter`]: The [`KeySchemaAdapter`] and schema validation
//! - [`error`]: Error types for key translation

pub mod adapter;
pub mod error;

pub use adapter::{validate_schema, KeySchemaAdapter};
pub use error::{Result, SchemaError};
pub use kvmount_types::{KeySchema, SchemaShape};
