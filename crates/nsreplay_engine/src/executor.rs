//! The batch executor.
//!
//! [`BatchExecutor::apply`] runs a [`NamespaceBatch`] against a store
//! transaction in four phases, each covering the whole batch before the
//! next starts:
//!
//! 1. resolve the identities of operations that need one (one lookup call)
//! 2. validate that every operation needing a match got one
//! 3. fetch prior documents for operations that need them (one fetch call)
//! 4. delete every resolved document the batch replaces, then insert every
//!    computed result (one delete call, then one insert call)
//!
//! Deleting before inserting lets a batch drop and recreate the same `_id`
//! without tripping the store's uniqueness check. Scratch state is keyed by
//! each operation's position in the batch and dropped when `apply` returns.
//!
//! The executor never retries and never commits; the caller owns the
//! transaction.

use crate::batch::NamespaceBatch;
use crate::config::ExecutorConfig;
use crate::error::{Mismatch, ReplayError, ReplayResult};
use crate::report::{NoopReporter, ReplayReporter};
use nsreplay_doc::{Document, Value};
use nsreplay_store::{InternalId, StoreTransaction};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Counts describing an applied batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// Operations whose identity resolved.
    pub resolved: usize,
    /// Prior documents fetched.
    pub fetched: usize,
    /// Documents the store reported deleted.
    pub deleted: usize,
    /// Documents inserted.
    pub inserted: usize,
    /// Operations whose resolved document was gone by fetch time.
    pub races: usize,
}

/// Applies namespace batches to store transactions.
///
/// Holds no per-batch state, so one executor can serve many threads as
/// long as each call gets its own transaction.
#[derive(Debug, Clone)]
pub struct BatchExecutor<R = NoopReporter> {
    config: ExecutorConfig,
    reporter: R,
}

impl BatchExecutor {
    /// Creates an executor with default configuration and no reporting.
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Creates an executor without reporting.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self::with_reporter(config, NoopReporter)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> BatchExecutor<R> {
    /// Returns the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the reporter.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }
}

impl<R: ReplayReporter> BatchExecutor<R> {
    /// Creates an executor that reports to `reporter`.
    pub fn with_reporter(config: ExecutorConfig, reporter: R) -> Self {
        Self { config, reporter }
    }

    /// Applies a batch within `txn`.
    ///
    /// On success every qualifying delete and insert has been issued to
    /// `txn`. On failure the caller must roll `txn` back; no delete or
    /// insert is issued once validation fails.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::BatchTooLarge`] before any store call
    /// - [`ReplayError::DuplicateKeyInBatch`] before any store call
    /// - [`ReplayError::BatchMismatch`] after the lookup, before any mutation
    /// - [`ReplayError::Store`] for anything the store rejects, unchanged
    pub fn apply<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        optimistic: bool,
    ) -> ReplayResult<ApplyOutcome>
    where
        T: StoreTransaction + ?Sized,
    {
        let started = Instant::now();
        let namespace = batch.namespace();

        match self.run(batch, txn, optimistic) {
            Ok(outcome) => {
                let elapsed = started.elapsed();
                if self.config.is_slow(elapsed) {
                    warn!(
                        %namespace,
                        ops = batch.len(),
                        ?elapsed,
                        "slow batch"
                    );
                }
                debug!(
                    %namespace,
                    ops = batch.len(),
                    optimistic,
                    deleted = outcome.deleted,
                    inserted = outcome.inserted,
                    "batch applied"
                );
                self.reporter.batch_applied(namespace, &outcome, elapsed);
                Ok(outcome)
            }
            Err(e) => {
                debug!(%namespace, error = %e, "batch failed");
                self.reporter.batch_failed(namespace, &e);
                Err(e)
            }
        }
    }

    fn run<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        optimistic: bool,
    ) -> ReplayResult<ApplyOutcome>
    where
        T: StoreTransaction + ?Sized,
    {
        if !self.config.accepts(batch.len()) {
            return Err(ReplayError::BatchTooLarge {
                namespace: batch.namespace().clone(),
                len: batch.len(),
                max: self.config.max_batch_ops,
            });
        }
        if batch.is_empty() {
            return Ok(ApplyOutcome::default());
        }

        let resolved = self.resolve_identities(batch, txn, optimistic)?;
        self.validate(batch, &resolved)?;
        let priors = self.fetch_priors(batch, txn, &resolved)?;
        let deleted = self.delete_replaced(batch, txn, &resolved)?;
        let (inserted, races) = self.insert_results(batch, txn, &resolved, &priors)?;

        Ok(ApplyOutcome {
            resolved: resolved.len(),
            fetched: priors.len(),
            deleted,
            inserted,
            races,
        })
    }

    /// Phase 1: one lookup over every key resolved in this mode.
    fn resolve_identities<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        optimistic: bool,
    ) -> ReplayResult<HashMap<usize, InternalId>>
    where
        T: StoreTransaction + ?Sized,
    {
        let namespace = batch.namespace();
        let mut owners: HashMap<&Value, usize> = HashMap::new();
        let mut keys = Vec::new();

        for (index, op) in batch.ops().iter().enumerate() {
            if !op.behavior().resolves(optimistic) {
                continue;
            }
            let key = op.key();
            if let Some(&first) = owners.get(key) {
                return Err(ReplayError::DuplicateKeyInBatch {
                    namespace: namespace.clone(),
                    key: key.clone(),
                    first,
                    second: index,
                });
            }
            owners.insert(key, index);
            keys.push(key.clone());
        }

        let mut resolved = HashMap::with_capacity(keys.len());
        if keys.is_empty() {
            return Ok(resolved);
        }

        for (key, id) in txn.resolve_identities(namespace, &keys)? {
            if let Some(&index) = owners.get(&key) {
                resolved.insert(index, id);
            }
        }

        trace!(%namespace, requested = keys.len(), found = resolved.len(), "identities resolved");
        self.reporter
            .identities_resolved(namespace, keys.len(), resolved.len());
        Ok(resolved)
    }

    /// Phase 2: collect every operation that needed a match and has none.
    fn validate(
        &self,
        batch: &NamespaceBatch,
        resolved: &HashMap<usize, InternalId>,
    ) -> ReplayResult<()> {
        let mismatches: Vec<Mismatch> = batch
            .ops()
            .iter()
            .enumerate()
            .filter(|(index, op)| op.behavior().needs_match && !resolved.contains_key(index))
            .map(|(index, op)| Mismatch {
                index,
                kind: op.kind(),
                key: op.key().clone(),
                message: op.mismatch_message(),
            })
            .collect();

        if mismatches.is_empty() {
            return Ok(());
        }

        let namespace = batch.namespace();
        for m in &mismatches {
            warn!(%namespace, index = m.index, kind = %m.kind, key = %m.key, "{}", m.message);
        }
        self.reporter.batch_mismatched(namespace, &mismatches);
        Err(ReplayError::BatchMismatch {
            namespace: namespace.clone(),
            mismatches,
        })
    }

    /// Phase 3: one fetch for every resolved operation that needs its prior document.
    fn fetch_priors<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        resolved: &HashMap<usize, InternalId>,
    ) -> ReplayResult<HashMap<usize, Document>>
    where
        T: StoreTransaction + ?Sized,
    {
        let namespace = batch.namespace();
        let mut owners = HashMap::new();
        let mut ids = Vec::new();

        for (index, op) in batch.ops().iter().enumerate() {
            if !op.behavior().needs_fetch {
                continue;
            }
            if let Some(&id) = resolved.get(&index) {
                owners.insert(id, index);
                ids.push(id);
            }
        }

        let mut priors = HashMap::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(priors);
        }

        for stored in txn.fetch(namespace, &ids)? {
            if let Some(&index) = owners.get(&stored.id) {
                priors.insert(index, stored.document);
            }
        }

        trace!(%namespace, requested = ids.len(), found = priors.len(), "prior documents fetched");
        self.reporter
            .documents_fetched(namespace, ids.len(), priors.len());
        Ok(priors)
    }

    /// Phase 4a: one delete for every resolved operation that replaces or removes.
    fn delete_replaced<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        resolved: &HashMap<usize, InternalId>,
    ) -> ReplayResult<usize>
    where
        T: StoreTransaction + ?Sized,
    {
        let namespace = batch.namespace();
        let ids: Vec<InternalId> = batch
            .ops()
            .iter()
            .enumerate()
            .filter(|(_, op)| op.behavior().causes_deletion)
            .filter_map(|(index, _)| resolved.get(&index).copied())
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = txn.delete(namespace, &ids)?;
        trace!(%namespace, requested = ids.len(), deleted, "documents deleted");
        self.reporter.documents_deleted(namespace, ids.len(), deleted);
        Ok(deleted)
    }

    /// Phase 4b: compute every result and insert the non-empty ones.
    fn insert_results<T>(
        &self,
        batch: &NamespaceBatch,
        txn: &mut T,
        resolved: &HashMap<usize, InternalId>,
        priors: &HashMap<usize, Document>,
    ) -> ReplayResult<(usize, usize)>
    where
        T: StoreTransaction + ?Sized,
    {
        let namespace = batch.namespace();
        let mut documents = Vec::new();
        let mut races = 0;

        for (index, op) in batch.ops().iter().enumerate() {
            let prior = priors.get(&index);
            if prior.is_none() && op.behavior().needs_fetch && resolved.contains_key(&index) {
                races += 1;
                warn!(%namespace, index, key = %op.key(), kind = %op.kind(), "resolved document vanished before fetch");
            }
            if let Some(doc) = op.compute_result(prior) {
                documents.push(doc);
            }
        }

        if documents.is_empty() {
            return Ok((0, races));
        }

        let count = documents.len();
        txn.insert(namespace, documents)?;
        trace!(%namespace, count, "documents inserted");
        self.reporter.documents_inserted(namespace, count);
        Ok((count, races))
    }
}
