use thiserror::Error;

/// Errors produced while building or parsing keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid key segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },
}
