//! Test fixtures and store helpers.

use nsreplay_doc::Document;
use nsreplay_store::{DocumentStore, InternalId, MemoryStore, Namespace, StoreTransaction};
use std::ops::Range;

/// The namespace used by default in tests.
pub fn test_namespace() -> Namespace {
    Namespace::new("test", "items")
}

/// Documents `{_id: i, n: i}` for each `i` in `ids`.
pub fn numbered_documents(ids: Range<i32>) -> Vec<Document> {
    ids.map(|i| Document::with_id(i).field("n", i)).collect()
}

/// Inserts and commits `documents`, returning their internal ids.
///
/// # Panics
///
/// Panics if the store rejects the insert or the commit.
pub fn seed(store: &MemoryStore, namespace: &Namespace, documents: Vec<Document>) -> Vec<InternalId> {
    let mut txn = store.begin().expect("Failed to begin transaction");
    let ids = txn
        .insert(namespace, documents)
        .expect("Failed to seed documents");
    store.commit(&mut txn).expect("Failed to commit seed");
    ids
}

/// Creates a store holding `documents` in `namespace`.
pub fn seeded_store(namespace: &Namespace, documents: Vec<Document>) -> MemoryStore {
    let store = MemoryStore::new();
    if !documents.is_empty() {
        seed(&store, namespace, documents);
    }
    store
}

/// Runs `f` against a fresh in-memory store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemoryStore) -> R,
{
    let store = MemoryStore::new();
    f(&store)
}
