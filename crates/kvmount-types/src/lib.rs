//! Foundation types for kvmount.
//!
//! Every other kvmount crate depends on `kvmount-types`.
//!
//! # Key Types
//!
//! - [`Key`]: Hierarchical, segment-ordered key as seen by callers
//! - [`NativeKey`]: The encoded key a backend actually stores
//! - [`NativeRange`]: A selection of native keys for scans
//! - [`Record`]: A key plus its byte payload
//! - [`KeySchema`]: Partition/sort field names declared for a backend

pub mod error;
pub mod key;
pub mod native;
pub mod record;
pub mod schema;

pub use bytes::Bytes;
pub use error::KeyError;
pub use key::{validate_segment, Key, SEPARATOR};
pub use native::{NativeKey, NativeRange};
pub use record::Record;
pub use schema::{KeySchema, SchemaShape};
