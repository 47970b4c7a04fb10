//! Transaction state for the in-memory store.

use super::{CollectionState, Shared, StoreState, StoredEntry};
use crate::capability::StoreTransaction;
use crate::error::{StoreError, StoreResult};
use crate::types::{CommitSeq, InternalId, Namespace, StoredDocument, TransactionId};
use bytes::Bytes;
use nsreplay_doc::{Document, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back or failed to commit.
    Aborted,
}

/// Writes buffered for one namespace.
#[derive(Debug, Default)]
struct PendingWrites {
    /// Documents inserted by this transaction.
    puts: BTreeMap<InternalId, StoredEntry>,
    /// `_id` -> internal id for `puts`.
    put_keys: HashMap<Value, InternalId>,
    /// Committed documents deleted by this transaction.
    deletes: BTreeSet<InternalId>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }
}

/// A transaction against a [`super::MemoryStore`].
///
/// Reads see committed state overlaid with this transaction's own writes.
/// Every `_id` read or written is recorded; commit fails if any of them was
/// modified by a transaction that committed after this one began.
pub struct MemoryTransaction {
    id: TransactionId,
    start_seq: CommitSeq,
    state: TransactionState,
    shared: Arc<Shared>,
    writes: HashMap<Namespace, PendingWrites>,
    touched: HashSet<(Namespace, Value)>,
}

impl MemoryTransaction {
    pub(super) fn new(id: TransactionId, start_seq: CommitSeq, shared: Arc<Shared>) -> Self {
        Self {
            id,
            start_seq,
            state: TransactionState::Active,
            shared,
            writes: HashMap::new(),
            touched: HashSet::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the commit sequence this transaction started from.
    #[must_use]
    pub fn start_seq(&self) -> CommitSeq {
        self.start_seq
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the number of buffered inserts and deletes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
            .values()
            .map(|w| w.puts.len() + w.deletes.len())
            .sum()
    }

    /// Validates and applies buffered writes to `state`.
    ///
    /// The caller holds the store's write lock.
    pub(super) fn commit_into(&mut self, state: &mut StoreState) -> StoreResult<CommitSeq> {
        self.ensure_active()?;

        for (namespace, key) in &self.touched {
            let modified = state
                .collections
                .get(namespace)
                .and_then(|c| c.versions.get(key))
                .is_some_and(|seq| *seq > self.start_seq);
            if modified {
                self.state = TransactionState::Aborted;
                tracing::debug!(txn = %self.id, %namespace, %key, "commit rejected by conflict");
                return Err(StoreError::TransactionConflict {
                    namespace: namespace.clone(),
                    key: key.clone(),
                });
            }
        }

        // Stale reads conflict even when nothing is left to write
        if self.writes.values().all(PendingWrites::is_empty) {
            self.state = TransactionState::Committed;
            return Ok(state.committed_seq);
        }

        let seq = state.committed_seq.next();
        for (namespace, pending) in std::mem::take(&mut self.writes) {
            let collection = state.collections.entry(namespace).or_default();
            for id in pending.deletes {
                if let Some(entry) = collection.docs.remove(&id) {
                    if collection.by_key.get(&entry.key) == Some(&id) {
                        collection.by_key.remove(&entry.key);
                    }
                    collection.versions.insert(entry.key, seq);
                }
            }
            for (id, entry) in pending.puts {
                collection.by_key.insert(entry.key.clone(), id);
                collection.versions.insert(entry.key.clone(), seq);
                collection.docs.insert(id, entry);
            }
        }

        state.committed_seq = seq;
        self.state = TransactionState::Committed;
        Ok(seq)
    }

    /// Discards buffered writes.
    pub(super) fn abort(&mut self) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes.clear();
        self.touched.clear();
        self.state = TransactionState::Aborted;
        Ok(())
    }

    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(StoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(StoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

fn lookup_key(
    pending: Option<&PendingWrites>,
    committed: Option<&CollectionState>,
    key: &Value,
) -> Option<InternalId> {
    if let Some(id) = pending.and_then(|p| p.put_keys.get(key)) {
        return Some(*id);
    }
    let id = *committed?.by_key.get(key)?;
    match pending {
        Some(p) if p.deletes.contains(&id) => None,
        _ => Some(id),
    }
}

fn lookup_entry<'a>(
    pending: Option<&'a PendingWrites>,
    committed: Option<&'a CollectionState>,
    id: InternalId,
) -> Option<&'a StoredEntry> {
    if let Some(entry) = pending.and_then(|p| p.puts.get(&id)) {
        return Some(entry);
    }
    if pending.is_some_and(|p| p.deletes.contains(&id)) {
        return None;
    }
    committed?.docs.get(&id)
}

impl StoreTransaction for MemoryTransaction {
    fn resolve_identities(
        &mut self,
        namespace: &Namespace,
        keys: &[Value],
    ) -> StoreResult<Vec<(Value, InternalId)>> {
        self.ensure_active()?;
        let shared = Arc::clone(&self.shared);
        let state = shared.state.read();
        let pending = self.writes.get(namespace);
        let committed = state.collections.get(namespace);

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            if let Some(id) = lookup_key(pending, committed, key) {
                found.push((key.clone(), id));
            }
        }

        for key in seen {
            self.touched.insert((namespace.clone(), key.clone()));
        }
        Ok(found)
    }

    fn fetch(
        &mut self,
        namespace: &Namespace,
        ids: &[InternalId],
    ) -> StoreResult<Vec<StoredDocument>> {
        self.ensure_active()?;
        let shared = Arc::clone(&self.shared);
        let state = shared.state.read();
        let pending = self.writes.get(namespace);
        let committed = state.collections.get(namespace);

        let mut docs = Vec::new();
        let mut keys = Vec::new();
        for id in ids {
            if let Some(entry) = lookup_entry(pending, committed, *id) {
                docs.push(StoredDocument {
                    id: *id,
                    document: Document::from_cbor(&entry.payload)?,
                });
                keys.push(entry.key.clone());
            }
        }

        for key in keys {
            self.touched.insert((namespace.clone(), key));
        }
        Ok(docs)
    }

    fn delete(&mut self, namespace: &Namespace, ids: &[InternalId]) -> StoreResult<usize> {
        self.ensure_active()?;
        let shared = Arc::clone(&self.shared);
        let state = shared.state.read();
        let committed = state.collections.get(namespace);
        let pending = self.writes.entry(namespace.clone()).or_default();

        let mut removed = Vec::new();
        for id in ids {
            if let Some(entry) = pending.puts.remove(id) {
                pending.put_keys.remove(&entry.key);
                removed.push(entry.key);
                continue;
            }
            if pending.deletes.contains(id) {
                continue;
            }
            if let Some(entry) = committed.and_then(|c| c.docs.get(id)) {
                pending.deletes.insert(*id);
                removed.push(entry.key.clone());
            }
        }

        let count = removed.len();
        for key in removed {
            self.touched.insert((namespace.clone(), key));
        }
        Ok(count)
    }

    fn insert(
        &mut self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<InternalId>> {
        self.ensure_active()?;
        if !self.shared.config.accepts_insert(documents.len()) {
            return Err(StoreError::invalid_operation(format!(
                "insert of {} documents exceeds limit of {}",
                documents.len(),
                self.shared.config.max_insert_batch
            )));
        }

        let shared = Arc::clone(&self.shared);
        let mut entries = Vec::with_capacity(documents.len());
        {
            let state = shared.state.read();
            let pending = self.writes.get(namespace);
            let committed = state.collections.get(namespace);
            let mut seen = HashSet::new();

            for doc in &documents {
                let key = doc.id().ok_or_else(|| {
                    StoreError::validation(format!("document without _id in {namespace}"))
                })?;
                if !seen.insert(key) || lookup_key(pending, committed, key).is_some() {
                    let concurrent = committed
                        .and_then(|c| c.versions.get(key))
                        .is_some_and(|seq| *seq > self.start_seq);
                    if concurrent {
                        return Err(StoreError::TransactionConflict {
                            namespace: namespace.clone(),
                            key: key.clone(),
                        });
                    }
                    return Err(StoreError::UniqueViolation {
                        namespace: namespace.clone(),
                        key: key.clone(),
                    });
                }
                entries.push(StoredEntry {
                    key: key.clone(),
                    payload: Bytes::from(doc.to_cbor()?),
                });
            }
        }

        let pending = self.writes.entry(namespace.clone()).or_default();
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = InternalId::new(shared.next_id.fetch_add(1, Ordering::SeqCst));
            self.touched.insert((namespace.clone(), entry.key.clone()));
            pending.put_keys.insert(entry.key.clone(), id);
            pending.puts.insert(id, entry);
            ids.push(id);
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("id", &self.id)
            .field("start_seq", &self.start_seq)
            .field("state", &self.state)
            .field("write_count", &self.write_count())
            .finish_non_exhaustive()
    }
}
