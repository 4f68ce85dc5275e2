use kvmount_schema::SchemaError;
use kvmount_store::StoreError;
use kvmount_types::KeyError;

/// Every problem found while validating a store configuration.
///
/// Validation does not stop at the first problem, so a broken config is
/// reported in full at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid store configuration: {}", .problems.join("; "))]
pub struct ConfigValidationError {
    pub problems: Vec<String>,
}

impl ConfigValidationError {
    pub fn new(problems: Vec<String>) -> Self {
        Self { problems }
    }

    /// Whether any problem mentions `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.problems.iter().any(|p| p.contains(field))
    }
}

/// Errors from router construction and routed operations.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    ConfigValidation(#[from] ConfigValidationError),

    /// The mount table cannot route every key (no root mount, or a
    /// duplicated prefix). Only raised while constructing a router.
    #[error("routing invariant violated: {0}")]
    RoutingInvariant(String),

    /// A key did not fit its mount's key schema, or a native key read back
    /// from a backend could not be decoded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// Passed through from the backend unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RouterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterError::Store(StoreError::NotFound { .. }))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RouterError::Store(StoreError::Unavailable { .. }))
    }

    pub fn is_key_encoding(&self) -> bool {
        matches!(self, RouterError::Schema(SchemaError::KeyEncoding { .. }))
    }
}

/// Result alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
