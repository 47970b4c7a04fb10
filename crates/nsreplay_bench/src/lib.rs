//! Benchmark workloads for nsreplay.

#![warn(missing_docs)]

use nsreplay_doc::Document;
use nsreplay_engine::{Modification, NamespaceBatch, ReplayOp, UpdateAction};
use nsreplay_store::{DocumentStore, MemoryStore, Namespace, StoreTransaction};
use rand::Rng;

/// Namespace used by every benchmark.
pub fn bench_namespace() -> Namespace {
    Namespace::new("bench", "docs")
}

/// Generates a document with `_id == id` and `fields` random fields.
pub fn random_document(id: i32, fields: usize) -> Document {
    let mut rng = rand::thread_rng();
    let mut doc = Document::with_id(id);
    for i in 0..fields {
        doc.set(format!("f{i}"), rng.gen::<i64>());
    }
    doc
}

/// Creates a store holding documents `0..count`.
pub fn populated_store(count: i32, fields: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let ns = bench_namespace();
    let mut txn = store.begin().expect("Failed to begin transaction");
    txn.insert(&ns, (0..count).map(|i| random_document(i, fields)).collect())
        .expect("Failed to populate store");
    store.commit(&mut txn).expect("Failed to commit");
    store
}

/// A batch of inserts for keys `start..start + len`.
pub fn insert_batch(start: i32, len: i32, fields: usize) -> NamespaceBatch {
    NamespaceBatch::new(
        bench_namespace(),
        (start..start + len)
            .map(|i| ReplayOp::insert(random_document(i, fields)))
            .collect(),
    )
}

/// A batch for standard replay: updates and deletes over stored keys
/// `0..len`, interleaved with inserts of fresh keys.
pub fn mixed_batch(len: i32) -> NamespaceBatch {
    let ops = (0..len)
        .map(|i| match i % 3 {
            0 => ReplayOp::update(
                i,
                UpdateAction::Modify(vec![Modification::increment("hits", 1)]),
            ),
            1 => ReplayOp::delete(i),
            _ => ReplayOp::insert(random_document(len + i, 4)),
        })
        .collect();
    NamespaceBatch::new(bench_namespace(), ops)
}

/// A batch for optimistic replay: delete-creates over keys `0..len`.
pub fn delete_create_batch(len: i32, fields: usize) -> NamespaceBatch {
    NamespaceBatch::new(
        bench_namespace(),
        (0..len)
            .map(|i| ReplayOp::delete_create(random_document(i, fields)))
            .collect(),
    )
}
