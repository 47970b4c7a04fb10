//! The store capability consumed by the replay engine.
//!
//! A store exposes four batched primitives, each scoped to one namespace and
//! executed inside a transaction: identity lookup, fetch, delete and insert.
//! How documents are laid out underneath (relational tables, a key-value
//! engine, memory) is the store's business.

use crate::error::{StoreError, StoreResult};
use crate::types::{CommitSeq, InternalId, Namespace, StoredDocument};
use nsreplay_doc::{Document, Value};

/// Batched document primitives executed within one transaction.
///
/// Implementations must not be shared between concurrent callers; each
/// caller owns its transaction handle.
pub trait StoreTransaction {
    /// Looks up the internal identifiers of documents whose `_id` is in `keys`.
    ///
    /// Returns the pairs that were found, in no particular order. Keys with
    /// no stored document are simply absent from the result.
    fn resolve_identities(
        &mut self,
        namespace: &Namespace,
        keys: &[Value],
    ) -> StoreResult<Vec<(Value, InternalId)>>;

    /// Fetches stored documents by internal identifier.
    ///
    /// Only documents actually stored are returned.
    fn fetch(
        &mut self,
        namespace: &Namespace,
        ids: &[InternalId],
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Deletes documents by internal identifier.
    ///
    /// Idempotent: absent ids are ignored. Returns the number removed.
    fn delete(&mut self, namespace: &Namespace, ids: &[InternalId]) -> StoreResult<usize>;

    /// Inserts documents, assigning each a fresh internal identifier.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if a document's `_id`
    /// already exists.
    fn insert(
        &mut self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<InternalId>>;
}

/// A transactional document store.
pub trait DocumentStore: Send + Sync {
    /// Transaction handle type.
    type Transaction: StoreTransaction + Send;

    /// Begins a new transaction.
    fn begin(&self) -> StoreResult<Self::Transaction>;

    /// Commits a transaction, making its writes visible atomically.
    fn commit(&self, txn: &mut Self::Transaction) -> StoreResult<CommitSeq>;

    /// Discards a transaction's writes.
    fn rollback(&self, txn: &mut Self::Transaction) -> StoreResult<()>;

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is rolled back and the original
    /// error is returned.
    fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut Self::Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut txn = self.begin()?;
        match f(&mut txn) {
            Ok(result) => {
                self.commit(&mut txn)?;
                Ok(result)
            }
            Err(e) => {
                // Try to roll back, but don't mask the original error
                let _ = self.rollback(&mut txn);
                Err(e)
            }
        }
    }
}
