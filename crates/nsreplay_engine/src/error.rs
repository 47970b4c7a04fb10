//! Error types for batch replay.

use crate::op::OpKind;
use nsreplay_doc::Value;
use nsreplay_store::{Namespace, StoreError, StoreErrorKind};
use std::fmt;
use thiserror::Error;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// An operation that required a stored document and found none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Position of the operation in its batch.
    pub index: usize,
    /// Operation kind.
    pub kind: OpKind,
    /// External identifier.
    pub key: Value,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}({}): {}", self.index, self.kind, self.key, self.message)
    }
}

/// Errors that fail a batch.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Operations needing a match had no resolvable identity.
    ///
    /// Nothing was deleted or inserted.
    #[error("{} unmatched operation(s) in {namespace}", mismatches.len())]
    BatchMismatch {
        /// Target namespace.
        namespace: Namespace,
        /// One entry per unmatched operation, in batch order.
        mismatches: Vec<Mismatch>,
    },

    /// Two operations resolved in the same pass share an external identifier.
    #[error("duplicate key {key} in batch for {namespace} (operations #{first} and #{second})")]
    DuplicateKeyInBatch {
        /// Target namespace.
        namespace: Namespace,
        /// The shared external identifier.
        key: Value,
        /// Position of the first operation.
        first: usize,
        /// Position of the second operation.
        second: usize,
    },

    /// The batch exceeds the configured operation limit.
    #[error("batch for {namespace} has {len} operations, limit is {max}")]
    BatchTooLarge {
        /// Target namespace.
        namespace: Namespace,
        /// Number of operations.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// The store rejected a call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Classification of a [`ReplayError`] for the replication driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayErrorKind {
    /// Unmatched operations; not retried.
    BatchMismatch,
    /// Concurrent modification detected by the store.
    TransactionConflict,
    /// Uniqueness constraint violated on insert.
    IntegrityViolation,
    /// Data rejected by the store.
    ApplicationValidation,
    /// The batch itself is malformed.
    InvalidBatch,
    /// Anything else the store reported.
    Internal,
}

impl ReplayError {
    /// Classifies this error.
    pub fn kind(&self) -> ReplayErrorKind {
        match self {
            ReplayError::BatchMismatch { .. } => ReplayErrorKind::BatchMismatch,
            ReplayError::DuplicateKeyInBatch { .. } | ReplayError::BatchTooLarge { .. } => {
                ReplayErrorKind::InvalidBatch
            }
            ReplayError::Store(e) => match e.kind() {
                StoreErrorKind::Conflict => ReplayErrorKind::TransactionConflict,
                StoreErrorKind::Integrity => ReplayErrorKind::IntegrityViolation,
                StoreErrorKind::Validation => ReplayErrorKind::ApplicationValidation,
                StoreErrorKind::Internal => ReplayErrorKind::Internal,
            },
        }
    }

    /// Returns true if replaying the same batch again can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReplayError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the mismatches of a [`ReplayError::BatchMismatch`].
    pub fn mismatches(&self) -> Option<&[Mismatch]> {
        match self {
            ReplayError::BatchMismatch { mismatches, .. } => Some(mismatches),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::new("db", "c")
    }

    #[test]
    fn classification() {
        let conflict = ReplayError::from(StoreError::TransactionConflict {
            namespace: ns(),
            key: Value::Int(1),
        });
        assert_eq!(conflict.kind(), ReplayErrorKind::TransactionConflict);
        assert!(conflict.is_retryable());

        let dup = ReplayError::from(StoreError::UniqueViolation {
            namespace: ns(),
            key: Value::Int(1),
        });
        assert_eq!(dup.kind(), ReplayErrorKind::IntegrityViolation);
        assert!(!dup.is_retryable());

        let invalid = ReplayError::from(StoreError::validation("no _id"));
        assert_eq!(invalid.kind(), ReplayErrorKind::ApplicationValidation);

        let too_large = ReplayError::BatchTooLarge {
            namespace: ns(),
            len: 3,
            max: 2,
        };
        assert_eq!(too_large.kind(), ReplayErrorKind::InvalidBatch);
        assert!(!too_large.is_retryable());
    }

    #[test]
    fn mismatch_display() {
        let err = ReplayError::BatchMismatch {
            namespace: ns(),
            mismatches: vec![Mismatch {
                index: 1,
                kind: OpKind::Delete,
                key: Value::Int(7),
                message: "no document with _id 7 to delete".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 unmatched operation(s) in db.c");
        assert_eq!(
            err.mismatches().unwrap()[0].to_string(),
            "#1 DELETE(7): no document with _id 7 to delete"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_errors_are_transparent() {
        let err = ReplayError::from(StoreError::invalid_operation("closed"));
        assert_eq!(err.to_string(), "invalid operation: closed");
        assert_eq!(err.kind(), ReplayErrorKind::Internal);
    }
}
