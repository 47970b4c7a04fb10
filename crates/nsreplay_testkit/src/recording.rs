//! Call recording for store transactions.
//!
//! [`RecordingTransaction`] wraps any [`StoreTransaction`] and logs each call
//! before delegating it, so tests can assert on exactly which batched calls
//! the engine issued and in what order. [`RecordingStore`] does the same at
//! the store level, for code that begins its own transactions.

use nsreplay_doc::{Document, Value};
use nsreplay_store::{
    CommitSeq, DocumentStore, InternalId, Namespace, StoreResult, StoreTransaction,
    StoredDocument,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, ordered log of store calls.
pub type CallLog = Arc<Mutex<Vec<StoreCall>>>;

/// Kind of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCallKind {
    /// Identity lookup.
    Resolve,
    /// Document fetch.
    Fetch,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Transaction commit.
    Commit,
    /// Transaction rollback.
    Rollback,
}

/// One recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `resolve_identities`.
    Resolve {
        /// Namespace argument.
        namespace: Namespace,
        /// Keys looked up.
        keys: Vec<Value>,
    },
    /// `fetch`.
    Fetch {
        /// Namespace argument.
        namespace: Namespace,
        /// Ids fetched.
        ids: Vec<InternalId>,
    },
    /// `delete`.
    Delete {
        /// Namespace argument.
        namespace: Namespace,
        /// Ids deleted.
        ids: Vec<InternalId>,
    },
    /// `insert`.
    Insert {
        /// Namespace argument.
        namespace: Namespace,
        /// Documents inserted.
        documents: Vec<Document>,
    },
    /// `commit`, recorded by [`RecordingStore`].
    Commit,
    /// `rollback`, recorded by [`RecordingStore`].
    Rollback,
}

impl StoreCall {
    /// Returns the call's kind.
    pub fn kind(&self) -> StoreCallKind {
        match self {
            StoreCall::Resolve { .. } => StoreCallKind::Resolve,
            StoreCall::Fetch { .. } => StoreCallKind::Fetch,
            StoreCall::Delete { .. } => StoreCallKind::Delete,
            StoreCall::Insert { .. } => StoreCallKind::Insert,
            StoreCall::Commit => StoreCallKind::Commit,
            StoreCall::Rollback => StoreCallKind::Rollback,
        }
    }

    /// Returns the internal ids a fetch or delete referenced.
    pub fn ids(&self) -> &[InternalId] {
        match self {
            StoreCall::Fetch { ids, .. } | StoreCall::Delete { ids, .. } => ids,
            _ => &[],
        }
    }

    /// Returns the external keys a lookup or insert referenced.
    pub fn keys(&self) -> Vec<Value> {
        match self {
            StoreCall::Resolve { keys, .. } => keys.clone(),
            StoreCall::Insert { documents, .. } => {
                documents.iter().filter_map(|d| d.id().cloned()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A transaction wrapper that records every call.
#[derive(Debug)]
pub struct RecordingTransaction<T> {
    inner: T,
    log: CallLog,
}

impl<T> RecordingTransaction<T> {
    /// Wraps `inner` with a fresh log.
    pub fn new(inner: T) -> Self {
        Self::with_log(inner, CallLog::default())
    }

    /// Wraps `inner`, appending to an existing log.
    pub fn with_log(inner: T, log: CallLog) -> Self {
        Self { inner, log }
    }

    /// Returns a copy of the calls recorded so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.log.lock().clone()
    }

    /// Returns the kinds of the calls recorded so far.
    pub fn kinds(&self) -> Vec<StoreCallKind> {
        self.log.lock().iter().map(StoreCall::kind).collect()
    }

    /// Returns the shared log.
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Returns the wrapped transaction.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwraps the transaction.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn record(&self, call: StoreCall) {
        self.log.lock().push(call);
    }
}

impl<T: StoreTransaction> StoreTransaction for RecordingTransaction<T> {
    fn resolve_identities(
        &mut self,
        namespace: &Namespace,
        keys: &[Value],
    ) -> StoreResult<Vec<(Value, InternalId)>> {
        self.record(StoreCall::Resolve {
            namespace: namespace.clone(),
            keys: keys.to_vec(),
        });
        self.inner.resolve_identities(namespace, keys)
    }

    fn fetch(
        &mut self,
        namespace: &Namespace,
        ids: &[InternalId],
    ) -> StoreResult<Vec<StoredDocument>> {
        self.record(StoreCall::Fetch {
            namespace: namespace.clone(),
            ids: ids.to_vec(),
        });
        self.inner.fetch(namespace, ids)
    }

    fn delete(&mut self, namespace: &Namespace, ids: &[InternalId]) -> StoreResult<usize> {
        self.record(StoreCall::Delete {
            namespace: namespace.clone(),
            ids: ids.to_vec(),
        });
        self.inner.delete(namespace, ids)
    }

    fn insert(
        &mut self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<InternalId>> {
        self.record(StoreCall::Insert {
            namespace: namespace.clone(),
            documents: documents.clone(),
        });
        self.inner.insert(namespace, documents)
    }
}

/// A store wrapper whose transactions all record into one shared log.
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    log: CallLog,
}

impl<S: DocumentStore> RecordingStore<S> {
    /// Wraps a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: CallLog::default(),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.log.lock().clone()
    }

    /// Returns the kinds of every call recorded so far.
    pub fn kinds(&self) -> Vec<StoreCallKind> {
        self.log.lock().iter().map(StoreCall::kind).collect()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl<S: DocumentStore> DocumentStore for RecordingStore<S> {
    type Transaction = RecordingTransaction<S::Transaction>;

    fn begin(&self) -> StoreResult<Self::Transaction> {
        Ok(RecordingTransaction::with_log(
            self.inner.begin()?,
            Arc::clone(&self.log),
        ))
    }

    fn commit(&self, txn: &mut Self::Transaction) -> StoreResult<CommitSeq> {
        self.log.lock().push(StoreCall::Commit);
        self.inner.commit(&mut txn.inner)
    }

    fn rollback(&self, txn: &mut Self::Transaction) -> StoreResult<()> {
        self.log.lock().push(StoreCall::Rollback);
        self.inner.rollback(&mut txn.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsreplay_store::MemoryStore;

    #[test]
    fn records_in_order() {
        let store = MemoryStore::new();
        let ns = Namespace::new("db", "c");
        let mut txn = RecordingTransaction::new(store.begin().unwrap());

        let ids = txn.insert(&ns, vec![Document::with_id(1)]).unwrap();
        txn.resolve_identities(&ns, &[Value::Int(1)]).unwrap();
        txn.delete(&ns, &ids).unwrap();

        assert_eq!(
            txn.kinds(),
            vec![
                StoreCallKind::Insert,
                StoreCallKind::Resolve,
                StoreCallKind::Delete
            ]
        );
        assert_eq!(txn.calls()[0].keys(), vec![Value::Int(1)]);
        assert_eq!(txn.calls()[2].ids(), ids.as_slice());
    }

    #[test]
    fn store_wrapper_records_lifecycle() {
        let store = RecordingStore::new(MemoryStore::new());
        let ns = Namespace::new("db", "c");

        let mut txn = store.begin().unwrap();
        txn.insert(&ns, vec![Document::with_id(1)]).unwrap();
        store.commit(&mut txn).unwrap();

        let mut txn = store.begin().unwrap();
        store.rollback(&mut txn).unwrap();

        assert_eq!(
            store.kinds(),
            vec![
                StoreCallKind::Insert,
                StoreCallKind::Commit,
                StoreCallKind::Rollback
            ]
        );
        assert_eq!(store.inner().count(&ns), 1);
    }
}
