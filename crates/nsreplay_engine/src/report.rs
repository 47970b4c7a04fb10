//! Outcome reporting.
//!
//! The executor calls a [`ReplayReporter`] as each phase completes.
//! Reporters observe; they cannot influence the outcome of a batch.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use nsreplay_engine::{BatchExecutor, ExecutorConfig, ReplayStats};
//!
//! let stats = Arc::new(ReplayStats::new());
//! let executor = BatchExecutor::with_reporter(ExecutorConfig::default(), Arc::clone(&stats));
//!
//! // Apply batches...
//!
//! let snapshot = stats.snapshot();
//! println!("Batches applied: {}", snapshot.batches_applied);
//! ```

use crate::error::{Mismatch, ReplayError};
use crate::executor::ApplyOutcome;
use nsreplay_store::{CommitSeq, Namespace};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Observer of per-phase replay results.
///
/// All hooks default to doing nothing.
#[allow(unused_variables)]
pub trait ReplayReporter: Send + Sync {
    /// Identity lookup finished; `found` of `requested` keys matched.
    fn identities_resolved(&self, namespace: &Namespace, requested: usize, found: usize) {}

    /// Validation failed.
    fn batch_mismatched(&self, namespace: &Namespace, mismatches: &[Mismatch]) {}

    /// Prior documents fetched; `found` of `requested` ids were stored.
    fn documents_fetched(&self, namespace: &Namespace, requested: usize, found: usize) {}

    /// Deletes issued; `deleted` of `requested` ids were removed.
    fn documents_deleted(&self, namespace: &Namespace, requested: usize, deleted: usize) {}

    /// Result documents inserted.
    fn documents_inserted(&self, namespace: &Namespace, count: usize) {}

    /// All phases completed within the transaction.
    fn batch_applied(&self, namespace: &Namespace, outcome: &ApplyOutcome, elapsed: Duration) {}

    /// The transaction holding an applied batch committed.
    fn batch_committed(&self, namespace: &Namespace, seq: CommitSeq) {}

    /// The batch failed, during apply or at commit.
    fn batch_failed(&self, namespace: &Namespace, error: &ReplayError) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ReplayReporter for NoopReporter {}

impl<R: ReplayReporter + ?Sized> ReplayReporter for Arc<R> {
    fn identities_resolved(&self, namespace: &Namespace, requested: usize, found: usize) {
        (**self).identities_resolved(namespace, requested, found);
    }

    fn batch_mismatched(&self, namespace: &Namespace, mismatches: &[Mismatch]) {
        (**self).batch_mismatched(namespace, mismatches);
    }

    fn documents_fetched(&self, namespace: &Namespace, requested: usize, found: usize) {
        (**self).documents_fetched(namespace, requested, found);
    }

    fn documents_deleted(&self, namespace: &Namespace, requested: usize, deleted: usize) {
        (**self).documents_deleted(namespace, requested, deleted);
    }

    fn documents_inserted(&self, namespace: &Namespace, count: usize) {
        (**self).documents_inserted(namespace, count);
    }

    fn batch_applied(&self, namespace: &Namespace, outcome: &ApplyOutcome, elapsed: Duration) {
        (**self).batch_applied(namespace, outcome, elapsed);
    }

    fn batch_committed(&self, namespace: &Namespace, seq: CommitSeq) {
        (**self).batch_committed(namespace, seq);
    }

    fn batch_failed(&self, namespace: &Namespace, error: &ReplayError) {
        (**self).batch_failed(namespace, error);
    }
}

/// Replay counters.
///
/// All counters are atomic and can be read while batches are in flight.
#[derive(Debug, Default)]
pub struct ReplayStats {
    batches_applied: AtomicU64,
    batches_committed: AtomicU64,
    batches_failed: AtomicU64,
    batches_mismatched: AtomicU64,
    mismatches: AtomicU64,
    keys_requested: AtomicU64,
    keys_resolved: AtomicU64,
    documents_fetched: AtomicU64,
    documents_deleted: AtomicU64,
    documents_inserted: AtomicU64,
    races: AtomicU64,
}

fn bump(counter: &AtomicU64, n: usize) {
    counter.fetch_add(n as u64, Ordering::Relaxed);
}

impl ReplayStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of batches whose phases all completed.
    pub fn batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::Relaxed)
    }

    /// Returns the number of batches committed.
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of failed batches, mismatches included.
    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> ReplayStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ReplayStatsSnapshot {
            batches_applied: load(&self.batches_applied),
            batches_committed: load(&self.batches_committed),
            batches_failed: load(&self.batches_failed),
            batches_mismatched: load(&self.batches_mismatched),
            mismatches: load(&self.mismatches),
            keys_requested: load(&self.keys_requested),
            keys_resolved: load(&self.keys_resolved),
            documents_fetched: load(&self.documents_fetched),
            documents_deleted: load(&self.documents_deleted),
            documents_inserted: load(&self.documents_inserted),
            races: load(&self.races),
        }
    }
}

impl ReplayReporter for ReplayStats {
    fn identities_resolved(&self, _namespace: &Namespace, requested: usize, found: usize) {
        bump(&self.keys_requested, requested);
        bump(&self.keys_resolved, found);
    }

    fn batch_mismatched(&self, _namespace: &Namespace, mismatches: &[Mismatch]) {
        bump(&self.batches_mismatched, 1);
        bump(&self.mismatches, mismatches.len());
    }

    fn documents_fetched(&self, _namespace: &Namespace, _requested: usize, found: usize) {
        bump(&self.documents_fetched, found);
    }

    fn documents_deleted(&self, _namespace: &Namespace, _requested: usize, deleted: usize) {
        bump(&self.documents_deleted, deleted);
    }

    fn documents_inserted(&self, _namespace: &Namespace, count: usize) {
        bump(&self.documents_inserted, count);
    }

    fn batch_applied(&self, _namespace: &Namespace, outcome: &ApplyOutcome, _elapsed: Duration) {
        bump(&self.batches_applied, 1);
        bump(&self.races, outcome.races);
    }

    fn batch_committed(&self, _namespace: &Namespace, _seq: CommitSeq) {
        bump(&self.batches_committed, 1);
    }

    fn batch_failed(&self, _namespace: &Namespace, _error: &ReplayError) {
        bump(&self.batches_failed, 1);
    }
}

/// A point-in-time copy of [`ReplayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayStatsSnapshot {
    /// Batches whose phases all completed.
    pub batches_applied: u64,
    /// Batches committed.
    pub batches_committed: u64,
    /// Batches that failed.
    pub batches_failed: u64,
    /// Batches that failed validation.
    pub batches_mismatched: u64,
    /// Total mismatch records.
    pub mismatches: u64,
    /// Keys sent to identity lookup.
    pub keys_requested: u64,
    /// Keys that resolved.
    pub keys_resolved: u64,
    /// Prior documents fetched.
    pub documents_fetched: u64,
    /// Documents deleted.
    pub documents_deleted: u64,
    /// Documents inserted.
    pub documents_inserted: u64,
    /// Resolved documents that vanished before fetch.
    pub races: u64,
}
