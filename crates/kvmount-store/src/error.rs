/// Errors from backend operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested key is not stored in the backend.
    ///
    /// This is a normal outcome of `get` and `delete`, not a failure.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The backend or its connector could not serve the request.
    ///
    /// The core never retries; retry policy belongs to the connector.
    #[error("backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The request could not be interpreted by the backend.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    pub fn not_found(key: impl ToString) -> Self {
        StoreError::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
