//! Store-bound replay: one transaction per batch.

use crate::batch::NamespaceBatch;
use crate::error::{ReplayError, ReplayErrorKind, ReplayResult};
use crate::executor::{ApplyOutcome, BatchExecutor};
use crate::report::{NoopReporter, ReplayReporter};
use nsreplay_store::DocumentStore;
use std::sync::Arc;
use tracing::debug;

/// Replays batches against a store, each in its own transaction.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nsreplay_doc::Document;
/// use nsreplay_engine::{NamespaceBatch, NamespaceReplayer, ReplayOp};
/// use nsreplay_store::{MemoryStore, Namespace};
///
/// let store = Arc::new(MemoryStore::new());
/// let replayer = NamespaceReplayer::new(Arc::clone(&store));
/// let ns = Namespace::new("shop", "orders");
///
/// let batch = NamespaceBatch::new(
///     ns.clone(),
///     vec![ReplayOp::insert(Document::with_id(1).field("total", 10))],
/// );
/// replayer.replay(&batch, false).unwrap();
///
/// assert_eq!(store.count(&ns), 1);
/// ```
pub struct NamespaceReplayer<S: DocumentStore, R = NoopReporter> {
    store: Arc<S>,
    executor: BatchExecutor<R>,
}

impl<S: DocumentStore> NamespaceReplayer<S> {
    /// Creates a replayer with a default executor.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_executor(store, BatchExecutor::new())
    }
}

impl<S: DocumentStore, R: ReplayReporter> NamespaceReplayer<S, R> {
    /// Creates a replayer using `executor`.
    pub fn with_executor(store: Arc<S>, executor: BatchExecutor<R>) -> Self {
        Self { store, executor }
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the executor.
    pub fn executor(&self) -> &BatchExecutor<R> {
        &self.executor
    }

    /// Applies `batch` in a fresh transaction and commits it.
    ///
    /// If applying fails the transaction is rolled back and the original
    /// error is returned. A failed commit is reported as a store error.
    pub fn replay(&self, batch: &NamespaceBatch, optimistic: bool) -> ReplayResult<ApplyOutcome> {
        let namespace = batch.namespace();
        let mut txn = self.store.begin()?;

        let outcome = match self.executor.apply(batch, &mut txn, optimistic) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Don't mask the original error
                let _ = self.store.rollback(&mut txn);
                return Err(e);
            }
        };

        match self.store.commit(&mut txn) {
            Ok(seq) => {
                debug!(%namespace, %seq, "batch committed");
                self.executor.reporter().batch_committed(namespace, seq);
                Ok(outcome)
            }
            Err(e) => {
                let _ = self.store.rollback(&mut txn);
                let err = ReplayError::from(e);
                debug!(%namespace, error = %err, "commit failed");
                self.executor.reporter().batch_failed(namespace, &err);
                Err(err)
            }
        }
    }

    /// Replays optimistically, falling back to standard replay on mismatch
    /// or on a uniqueness violation.
    ///
    /// Optimistic replay resolves only delete-create operations. Any
    /// operation that needs a match fails it as a mismatch, and an upsert
    /// of a stored key inserts over the existing document and collides
    /// with it. Both leave the store untouched, so the batch is replayed in
    /// standard mode in a new transaction. Other errors are returned as
    /// they are.
    pub fn replay_with_fallback(&self, batch: &NamespaceBatch) -> ReplayResult<ApplyOutcome> {
        match self.replay(batch, true) {
            Err(e) if Self::falls_back(&e) => {
                debug!(
                    namespace = %batch.namespace(),
                    error = %e,
                    "optimistic replay failed, retrying in standard mode"
                );
                self.replay(batch, false)
            }
            other => other,
        }
    }

    fn falls_back(err: &ReplayError) -> bool {
        matches!(
            err.kind(),
            ReplayErrorKind::BatchMismatch | ReplayErrorKind::IntegrityViolation
        )
    }

    /// Replays batches in order, stopping at the first failure.
    ///
    /// Batches before the failing one stay committed.
    pub fn replay_all<'a, I>(&self, batches: I, optimistic: bool) -> ReplayResult<ApplyOutcome>
    where
        I: IntoIterator<Item = &'a NamespaceBatch>,
    {
        let mut total = ApplyOutcome::default();
        for batch in batches {
            let outcome = self.replay(batch, optimistic)?;
            total.resolved += outcome.resolved;
            total.fetched += outcome.fetched;
            total.deleted += outcome.deleted;
            total.inserted += outcome.inserted;
            total.races += outcome.races;
        }
        Ok(total)
    }
}

impl<S: DocumentStore, R> std::fmt::Debug for NamespaceReplayer<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceReplayer")
            .field("config", self.executor.config())
            .finish_non_exhaustive()
    }
}
