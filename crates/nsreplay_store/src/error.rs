//! Error types for the store.

use crate::types::Namespace;
use nsreplay_doc::{DocError, Value};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a document store can surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent transaction modified a document this transaction touched.
    #[error("transaction conflict on key {key} in {namespace}")]
    TransactionConflict {
        /// Namespace of the conflicting document.
        namespace: Namespace,
        /// External identifier of the conflicting document.
        key: Value,
    },

    /// An inserted document's `_id` already exists.
    #[error("duplicate key {key} in {namespace}")]
    UniqueViolation {
        /// Namespace of the insert.
        namespace: Namespace,
        /// The duplicated external identifier.
        key: Value,
    },

    /// A document was rejected as invalid data.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// A stored payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] DocError),

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Concurrency conflict; retrying the whole transaction may succeed.
    Conflict,
    /// Uniqueness constraint violated.
    Integrity,
    /// Recognized data error.
    Validation,
    /// Anything else.
    Internal,
}

impl StoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::TransactionConflict { .. } => StoreErrorKind::Conflict,
            StoreError::UniqueViolation { .. } => StoreErrorKind::Integrity,
            StoreError::Validation { .. } => StoreErrorKind::Validation,
            StoreError::Codec(_) | StoreError::InvalidOperation { .. } => StoreErrorKind::Internal,
        }
    }

    /// Returns true if retrying the transaction can succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == StoreErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let ns = Namespace::new("db", "c");
        let conflict = StoreError::TransactionConflict {
            namespace: ns.clone(),
            key: Value::Int(1),
        };
        assert_eq!(conflict.kind(), StoreErrorKind::Conflict);
        assert!(conflict.is_retryable());

        let dup = StoreError::UniqueViolation {
            namespace: ns,
            key: Value::Int(1),
        };
        assert_eq!(dup.kind(), StoreErrorKind::Integrity);
        assert!(!dup.is_retryable());

        assert_eq!(
            StoreError::validation("missing _id").kind(),
            StoreErrorKind::Validation
        );
        assert_eq!(
            StoreError::invalid_operation("closed").kind(),
            StoreErrorKind::Internal
        );
    }

    #[test]
    fn error_display() {
        let err = StoreError::UniqueViolation {
            namespace: Namespace::new("db", "c"),
            key: Value::from("k"),
        };
        assert_eq!(err.to_string(), "duplicate key \"k\" in db.c");
    }
}
