//! In-memory transactional document store.
//!
//! `MemoryStore` is the reference implementation of [`DocumentStore`]. It
//! keeps one collection per namespace with a unique index on `_id`, stores
//! documents as CBOR payloads, and detects write conflicts at commit time
//! (first committer wins). An insert that collides with a key committed
//! after the transaction began fails early with a conflict rather than a
//! uniqueness violation.

mod transaction;

pub use transaction::{MemoryTransaction, TransactionState};

use crate::capability::DocumentStore;
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::types::{CommitSeq, InternalId, Namespace, StoredDocument, TransactionId};
use bytes::Bytes;
use nsreplay_doc::{Document, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A stored document payload and its `_id`.
#[derive(Debug, Clone)]
struct StoredEntry {
    key: Value,
    payload: Bytes,
}

/// Committed contents of one namespace.
#[derive(Debug, Default)]
struct CollectionState {
    docs: BTreeMap<InternalId, StoredEntry>,
    /// Unique index on `_id`.
    by_key: HashMap<Value, InternalId>,
    /// Last commit that inserted or deleted each `_id`.
    versions: HashMap<Value, CommitSeq>,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<Namespace, CollectionState>,
    committed_seq: CommitSeq,
}

/// State shared between the store and its transactions.
#[derive(Debug)]
struct Shared {
    state: RwLock<StoreState>,
    next_id: AtomicU64,
    config: StoreConfig,
}

/// In-memory implementation of [`DocumentStore`].
///
/// # Example
///
/// ```
/// use nsreplay_doc::Document;
/// use nsreplay_store::{DocumentStore, MemoryStore, Namespace, StoreError, StoreTransaction};
///
/// let store = MemoryStore::new();
/// let ns = Namespace::new("shop", "orders");
///
/// store
///     .transaction(|txn| {
///         txn.insert(&ns, vec![Document::with_id(1).field("total", 10)])?;
///         Ok::<_, StoreError>(())
///     })
///     .unwrap();
///
/// assert_eq!(store.count(&ns), 1);
/// ```
pub struct MemoryStore {
    shared: Arc<Shared>,
    next_txid: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(StoreState::default()),
                next_id: AtomicU64::new(1),
                config,
            }),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Returns the current committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> CommitSeq {
        self.shared.state.read().committed_seq
    }

    /// Returns the number of committed documents in a namespace.
    #[must_use]
    pub fn count(&self, namespace: &Namespace) -> usize {
        self.shared
            .state
            .read()
            .collections
            .get(namespace)
            .map_or(0, |c| c.docs.len())
    }

    /// Finds a committed document by `_id`.
    pub fn find_by_key(
        &self,
        namespace: &Namespace,
        key: &Value,
    ) -> StoreResult<Option<StoredDocument>> {
        let state = self.shared.state.read();
        let Some(collection) = state.collections.get(namespace) else {
            return Ok(None);
        };
        let Some(id) = collection.by_key.get(key) else {
            return Ok(None);
        };
        match collection.docs.get(id) {
            Some(entry) => Ok(Some(StoredDocument {
                id: *id,
                document: Document::from_cbor(&entry.payload)?,
            })),
            None => Ok(None),
        }
    }

    /// Lists committed documents in a namespace, ordered by internal id.
    pub fn documents(&self, namespace: &Namespace) -> StoreResult<Vec<StoredDocument>> {
        let state = self.shared.state.read();
        let Some(collection) = state.collections.get(namespace) else {
            return Ok(Vec::new());
        };
        collection
            .docs
            .iter()
            .map(|(id, entry)| {
                Ok(StoredDocument {
                    id: *id,
                    document: Document::from_cbor(&entry.payload)?,
                })
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    type Transaction = MemoryTransaction;

    fn begin(&self) -> StoreResult<MemoryTransaction> {
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let start_seq = self.committed_seq();
        Ok(MemoryTransaction::new(
            txid,
            start_seq,
            Arc::clone(&self.shared),
        ))
    }

    fn commit(&self, txn: &mut MemoryTransaction) -> StoreResult<CommitSeq> {
        let mut state = self.shared.state.write();
        let seq = txn.commit_into(&mut state)?;
        tracing::trace!(txn = %txn.id(), %seq, "transaction committed");
        Ok(seq)
    }

    fn rollback(&self, txn: &mut MemoryTransaction) -> StoreResult<()> {
        txn.abort()?;
        tracing::trace!(txn = %txn.id(), "transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}
