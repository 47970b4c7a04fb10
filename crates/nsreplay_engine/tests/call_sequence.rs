//! Store call sequences issued by the executor.

use nsreplay_doc::{Document, Value};
use nsreplay_engine::{
    BatchExecutor, Modification, NamespaceBatch, NamespaceReplayer, ReplayError, ReplayErrorKind,
    ReplayOp, UpdateAction,
};
use nsreplay_store::{InternalId, MemoryStore, Namespace, StoreError};
use nsreplay_testkit::prelude::*;
use std::sync::Arc;

fn ids(raw: &[u64]) -> Vec<InternalId> {
    raw.iter().copied().map(InternalId::new).collect()
}

fn batch(ops: Vec<ReplayOp>) -> NamespaceBatch {
    NamespaceBatch::new(test_namespace(), ops)
}

#[test]
fn update_and_delete_scenario() {
    let mut txn = RecordingTransaction::new(
        ScriptedTransaction::new()
            .with_document(10, Document::with_id(5).field("a", 1))
            .with_document(11, Document::with_id(7).field("a", 2)),
    );
    let batch = batch(vec![
        ReplayOp::update(
            5,
            UpdateAction::Modify(vec![Modification::set("newField", "X")]),
        ),
        ReplayOp::delete(7),
    ]);

    BatchExecutor::new().apply(&batch, &mut txn, false).unwrap();

    let ns = test_namespace();
    assert_eq!(
        txn.calls(),
        vec![
            StoreCall::Resolve {
                namespace: ns.clone(),
                keys: vec![Value::Int(5), Value::Int(7)],
            },
            StoreCall::Fetch {
                namespace: ns.clone(),
                ids: ids(&[10]),
            },
            StoreCall::Delete {
                namespace: ns.clone(),
                ids: ids(&[10, 11]),
            },
            StoreCall::Insert {
                namespace: ns,
                documents: vec![Document::with_id(5).field("a", 1).field("newField", "X")],
            },
        ]
    );
    let inner = txn.into_inner();
    assert!(inner.find_by_key(&Value::Int(7)).is_none());
    assert_eq!(inner.documents().len(), 1);
}

#[test]
fn mismatch_names_exactly_the_missing_operation() {
    let mut txn =
        RecordingTransaction::new(ScriptedTransaction::new().with_document(1, Document::with_id(1)));
    let batch = batch(vec![
        ReplayOp::delete(1),
        ReplayOp::delete(2),
        ReplayOp::insert(Document::with_id(3)),
    ]);

    let err = BatchExecutor::new()
        .apply(&batch, &mut txn, false)
        .unwrap_err();

    let mismatches = err.mismatches().unwrap();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].index, 1);
    assert_eq!(mismatches[0].key, Value::Int(2));
    assert_eq!(txn.kinds(), vec![StoreCallKind::Resolve]);
}

#[test]
fn delete_is_issued_before_insert_of_same_key() {
    let ns = test_namespace();
    let store = seeded_store(&ns, vec![Document::with_id(1).field("v", "old")]);
    let replayer = NamespaceReplayer::new(Arc::new(RecordingStore::new(store)));

    let batch = batch(vec![
        ReplayOp::delete(1),
        ReplayOp::insert(Document::with_id(1).field("v", "new")),
    ]);
    replayer.replay(&batch, false).unwrap();

    let store = replayer.store();
    assert_eq!(
        store.kinds(),
        vec![
            StoreCallKind::Resolve,
            StoreCallKind::Delete,
            StoreCallKind::Insert,
            StoreCallKind::Commit
        ]
    );
    let doc = store
        .inner()
        .find_by_key(&ns, &Value::Int(1))
        .unwrap()
        .unwrap();
    assert_eq!(doc.document.get("v"), Some(&Value::from("new")));
}

#[test]
fn optimistic_delete_create_deletes_before_inserting() {
    let ns = test_namespace();
    let store = MemoryStore::new();
    let seeded = seed(&store, &ns, vec![Document::with_id(0).field("v", "old")]);
    let replayer = NamespaceReplayer::new(Arc::new(RecordingStore::new(store)));

    let fresh = Document::with_id(0).field("v", "new");
    let created = Document::with_id(5);
    let batch = batch(vec![
        ReplayOp::delete_create(fresh.clone()),
        ReplayOp::delete_create(created.clone()),
    ]);
    let outcome = replayer.replay(&batch, true).unwrap();

    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.inserted, 2);
    let store = replayer.store();
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::Resolve {
                namespace: ns.clone(),
                keys: vec![Value::Int(0), Value::Int(5)],
            },
            StoreCall::Delete {
                namespace: ns.clone(),
                ids: seeded,
            },
            StoreCall::Insert {
                namespace: ns.clone(),
                documents: vec![fresh, created],
            },
            StoreCall::Commit,
        ]
    );
    let doc = store
        .inner()
        .find_by_key(&ns, &Value::Int(0))
        .unwrap()
        .unwrap();
    assert_eq!(doc.document.get("v"), Some(&Value::from("new")));
    assert_eq!(store.inner().count(&ns), 2);
}

#[test]
fn optimistic_mode_resolves_only_delete_create() {
    let mut txn = RecordingTransaction::new(ScriptedTransaction::new());
    let batch = batch(vec![
        ReplayOp::insert(Document::with_id(1)),
        ReplayOp::delete_create(Document::with_id(2)),
        ReplayOp::upsert(3, UpdateAction::Replace(Document::new().field("x", 1))),
        ReplayOp::noop(4),
        ReplayOp::delete_create(Document::with_id(5)),
    ]);

    BatchExecutor::new().apply(&batch, &mut txn, true).unwrap();

    let resolve = &txn.calls()[0];
    assert_eq!(resolve.kind(), StoreCallKind::Resolve);
    assert_eq!(resolve.keys(), vec![Value::Int(2), Value::Int(5)]);
}

#[test]
fn standard_mode_skips_delete_create_lookup() {
    let mut txn = RecordingTransaction::new(ScriptedTransaction::new());
    let batch = batch(vec![
        ReplayOp::delete_create(Document::with_id(2)),
        ReplayOp::insert(Document::with_id(3)),
    ]);

    BatchExecutor::new().apply(&batch, &mut txn, false).unwrap();
    assert_eq!(txn.kinds(), vec![StoreCallKind::Insert]);
}

#[test]
fn vanished_document_skips_update_but_siblings_apply() {
    let mut txn = RecordingTransaction::new(
        ScriptedTransaction::new()
            .with_dangling_identity(5, 50)
            .with_document(11, Document::with_id(7)),
    );
    let batch = batch(vec![
        ReplayOp::update(5, UpdateAction::Replace(Document::new().field("v", 1))),
        ReplayOp::delete(7),
        ReplayOp::insert(Document::with_id(8)),
    ]);

    let outcome = BatchExecutor::new().apply(&batch, &mut txn, false).unwrap();

    assert_eq!(outcome.races, 1);
    assert_eq!(outcome.fetched, 0);
    assert_eq!(outcome.inserted, 1);
    let calls = txn.calls();
    assert_eq!(calls[2].ids(), ids(&[50, 11]).as_slice());
    assert_eq!(calls[3].keys(), vec![Value::Int(8)]);
}

#[test]
fn error_operation_fails_without_store_calls() {
    let mut txn = RecordingTransaction::new(ScriptedTransaction::new());
    let batch = batch(vec![
        ReplayOp::insert(Document::with_id(1)),
        ReplayOp::error(2, "unrecognized oplog entry"),
    ]);

    let err = BatchExecutor::new()
        .apply(&batch, &mut txn, false)
        .unwrap_err();

    assert_eq!(err.kind(), ReplayErrorKind::BatchMismatch);
    assert_eq!(err.mismatches().unwrap()[0].message, "unrecognized oplog entry");
    assert!(txn.calls().is_empty());
}

#[test]
fn store_conflict_propagates_unchanged() {
    let ns = test_namespace();
    let mut txn = RecordingTransaction::new(
        ScriptedTransaction::new()
            .with_document(1, Document::with_id(1))
            .fail_on(
                StoreCallKind::Insert,
                StoreError::TransactionConflict {
                    namespace: ns.clone(),
                    key: Value::Int(1),
                },
            ),
    );
    let batch = batch(vec![ReplayOp::update(
        1,
        UpdateAction::Replace(Document::new()),
    )]);

    let err = BatchExecutor::new()
        .apply(&batch, &mut txn, false)
        .unwrap_err();

    assert!(matches!(
        err,
        ReplayError::Store(StoreError::TransactionConflict { .. })
    ));
    assert!(err.is_retryable());
    // One attempt per phase, no retries
    assert_eq!(
        txn.kinds(),
        vec![
            StoreCallKind::Resolve,
            StoreCallKind::Fetch,
            StoreCallKind::Delete,
            StoreCallKind::Insert
        ]
    );
}

#[test]
fn missing_id_is_application_validation() {
    let store = MemoryStore::new();
    let replayer = NamespaceReplayer::new(Arc::new(store));
    let batch = batch(vec![ReplayOp::insert(Document::new().field("a", 1))]);

    let err = replayer.replay(&batch, false).unwrap_err();
    assert_eq!(err.kind(), ReplayErrorKind::ApplicationValidation);
}

#[test]
fn failed_replay_rolls_back() {
    let ns = test_namespace();
    let store = RecordingStore::new(seeded_store(&ns, numbered_documents(0..2)));
    let replayer = NamespaceReplayer::new(Arc::new(store));

    // Deleting 0 succeeds, but inserting 1 collides with the stored document
    let batch = batch(vec![
        ReplayOp::delete(0),
        ReplayOp::insert(Document::with_id(1)),
    ]);
    let err = replayer.replay(&batch, false).unwrap_err();

    assert_eq!(err.kind(), ReplayErrorKind::IntegrityViolation);
    let store = replayer.store();
    assert_eq!(store.kinds().last(), Some(&StoreCallKind::Rollback));
    assert_eq!(store.inner().count(&ns), 2);
}

#[test]
fn other_namespaces_are_untouched() {
    let ns = test_namespace();
    let other = Namespace::new("test", "other");
    let store = MemoryStore::new();
    seed(&store, &ns, numbered_documents(0..3));
    seed(&store, &other, numbered_documents(0..3));
    let replayer = NamespaceReplayer::new(Arc::new(store));

    replayer
        .replay(&batch(vec![ReplayOp::delete(0), ReplayOp::delete(1)]), false)
        .unwrap();

    assert_eq!(replayer.store().count(&ns), 1);
    assert_eq!(replayer.store().count(&other), 3);
}
