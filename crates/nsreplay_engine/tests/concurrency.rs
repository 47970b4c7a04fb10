//! Concurrent replay against one store.

use nsreplay_doc::{Document, Value};
use nsreplay_engine::{
    BatchExecutor, ExecutorConfig, Modification, NamespaceBatch, NamespaceReplayer, ReplayOp,
    ReplayStats, UpdateAction,
};
use nsreplay_store::{
    DocumentStore, InternalId, MemoryStore, MemoryTransaction, Namespace, StoreErrorKind,
    StoreResult, StoreTransaction, StoredDocument,
};
use nsreplay_testkit::prelude::*;
use std::sync::Arc;
use std::thread;

const THREADS: i32 = 8;

type StatsReplayer = NamespaceReplayer<MemoryStore, Arc<ReplayStats>>;

fn replayer(store: MemoryStore) -> (StatsReplayer, Arc<ReplayStats>) {
    let stats = Arc::new(ReplayStats::new());
    let executor = BatchExecutor::with_reporter(ExecutorConfig::default(), Arc::clone(&stats));
    (
        NamespaceReplayer::with_executor(Arc::new(store), executor),
        stats,
    )
}

#[test]
fn disjoint_batches_all_commit() {
    let (replayer, stats) = replayer(MemoryStore::new());

    thread::scope(|s| {
        for t in 0..THREADS {
            let replayer = &replayer;
            s.spawn(move || {
                let ops = (0..10)
                    .map(|i| ReplayOp::insert(Document::with_id(t * 100 + i)))
                    .collect();
                replayer
                    .replay(&NamespaceBatch::new(test_namespace(), ops), false)
                    .unwrap();
            });
        }
    });

    assert_eq!(replayer.store().count(&test_namespace()), (THREADS * 10) as usize);
    assert_eq!(stats.batches_committed(), THREADS as u64);
}

#[test]
fn conflicting_batches_apply_once_each_with_retry() {
    let ns = test_namespace();
    let (replayer, stats) = replayer(seeded_store(&ns, vec![Document::with_id(1).field("n", 0)]));
    let batch = NamespaceBatch::new(
        ns.clone(),
        vec![ReplayOp::update(
            1,
            UpdateAction::Modify(vec![Modification::increment("n", 1)]),
        )],
    );

    thread::scope(|s| {
        for _ in 0..THREADS {
            let replayer = &replayer;
            let batch = &batch;
            s.spawn(move || loop {
                match replayer.replay(batch, false) {
                    Ok(_) => break,
                    Err(e) if e.is_retryable() => continue,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            });
        }
    });

    let doc = replayer
        .store()
        .find_by_key(&ns, &Value::Int(1))
        .unwrap()
        .unwrap();
    assert_eq!(doc.document.get("n"), Some(&Value::Int(THREADS)));
    assert_eq!(replayer.store().count(&ns), 1);

    let snap = stats.snapshot();
    assert_eq!(snap.batches_committed, THREADS as u64);
    assert!(snap.batches_applied >= THREADS as u64);
}

/// Commits `interleaved` on the same store right before the first fetch.
struct CommitBeforeFetch<'a> {
    store: &'a MemoryStore,
    inner: MemoryTransaction,
    interleaved: Option<NamespaceBatch>,
}

impl StoreTransaction for CommitBeforeFetch<'_> {
    fn resolve_identities(
        &mut self,
        namespace: &Namespace,
        keys: &[Value],
    ) -> StoreResult<Vec<(Value, InternalId)>> {
        self.inner.resolve_identities(namespace, keys)
    }

    fn fetch(
        &mut self,
        namespace: &Namespace,
        ids: &[InternalId],
    ) -> StoreResult<Vec<StoredDocument>> {
        if let Some(batch) = self.interleaved.take() {
            let mut other = self.store.begin()?;
            BatchExecutor::new()
                .apply(&batch, &mut other, false)
                .expect("interleaved batch failed");
            self.store.commit(&mut other)?;
        }
        self.inner.fetch(namespace, ids)
    }

    fn delete(&mut self, namespace: &Namespace, ids: &[InternalId]) -> StoreResult<usize> {
        self.inner.delete(namespace, ids)
    }

    fn insert(
        &mut self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<InternalId>> {
        self.inner.insert(namespace, documents)
    }
}

#[test]
fn update_racing_a_commit_conflicts_and_retries() {
    let ns = test_namespace();
    let store = seeded_store(&ns, vec![Document::with_id(1).field("n", 0)]);
    let increment = NamespaceBatch::new(
        ns.clone(),
        vec![ReplayOp::update(
            1,
            UpdateAction::Modify(vec![Modification::increment("n", 1)]),
        )],
    );

    let mut txn = CommitBeforeFetch {
        store: &store,
        inner: store.begin().unwrap(),
        interleaved: Some(increment.clone()),
    };
    let outcome = BatchExecutor::new()
        .apply(&increment, &mut txn, false)
        .unwrap();
    assert_eq!(outcome.resolved, 1);
    assert_eq!(outcome.fetched, 0);
    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.races, 1);

    let err = store.commit(&mut txn.inner).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::Conflict);
    assert!(err.is_retryable());

    let doc = store.find_by_key(&ns, &Value::Int(1)).unwrap().unwrap();
    assert_eq!(doc.document.get("n"), Some(&Value::Int(1)));

    // The retry sees the interleaved commit and applies on top of it
    let replayer = NamespaceReplayer::new(Arc::new(store));
    replayer.replay(&increment, false).unwrap();
    let doc = replayer
        .store()
        .find_by_key(&ns, &Value::Int(1))
        .unwrap()
        .unwrap();
    assert_eq!(doc.document.get("n"), Some(&Value::Int(2)));
}
