//! Error types for key schema translation.

use thiserror::Error;

/// Errors that can occur while translating keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The key does not have the shape the mount's schema requires.
    #[error("cannot encode key {key}: {reason}")]
    KeyEncoding { key: String, reason: String },

    /// A native key could not have been produced by this schema.
    #[error("cannot decode native key {native}: {reason}")]
    KeyDecoding { native: String, reason: String },

    /// The schema descriptor itself is unusable.
    #[error("invalid key schema: {0}")]
    InvalidSchema(String),
}

/// Convenience type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
