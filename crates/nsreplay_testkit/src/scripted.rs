//! A hand-configured store transaction.
//!
//! [`ScriptedTransaction`] answers calls from a fixed table of documents and
//! identities, so tests can pin exact internal ids, simulate a document that
//! vanishes between lookup and fetch, or make any call fail with a chosen
//! store error. It ignores the namespace argument.

use crate::recording::StoreCallKind;
use nsreplay_doc::{Document, Value};
use nsreplay_store::{
    InternalId, Namespace, StoreError, StoreResult, StoreTransaction, StoredDocument,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A single-namespace transaction with scripted contents and failures.
#[derive(Debug, Default)]
pub struct ScriptedTransaction {
    documents: BTreeMap<InternalId, Document>,
    identities: HashMap<Value, InternalId>,
    failures: HashMap<StoreCallKind, StoreError>,
    next_id: u64,
}

impl ScriptedTransaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Stores `document` under internal id `id`, indexed by its `_id`.
    #[must_use]
    pub fn with_document(mut self, id: u64, document: Document) -> Self {
        let id = InternalId::new(id);
        if let Some(key) = document.id() {
            self.identities.insert(key.clone(), id);
        }
        self.documents.insert(id, document);
        self.next_id = self.next_id.max(id.as_u64() + 1);
        self
    }

    /// Makes `key` resolve to `id` without storing a document.
    ///
    /// Fetching `id` then returns nothing, as if the document were deleted
    /// concurrently after the lookup.
    #[must_use]
    pub fn with_dangling_identity(mut self, key: impl Into<Value>, id: u64) -> Self {
        self.identities.insert(key.into(), InternalId::new(id));
        self.next_id = self.next_id.max(id + 1);
        self
    }

    /// Makes the next call of `kind` fail with `error`.
    #[must_use]
    pub fn fail_on(mut self, kind: StoreCallKind, error: StoreError) -> Self {
        self.failures.insert(kind, error);
        self
    }

    /// Returns the current documents.
    pub fn documents(&self) -> &BTreeMap<InternalId, Document> {
        &self.documents
    }

    /// Finds a current document by `_id`.
    pub fn find_by_key(&self, key: &Value) -> Option<&Document> {
        let id = self.identities.get(key)?;
        self.documents.get(id)
    }

    fn check(&mut self, kind: StoreCallKind) -> StoreResult<()> {
        match self.failures.remove(&kind) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl StoreTransaction for ScriptedTransaction {
    fn resolve_identities(
        &mut self,
        _namespace: &Namespace,
        keys: &[Value],
    ) -> StoreResult<Vec<(Value, InternalId)>> {
        self.check(StoreCallKind::Resolve)?;
        Ok(keys
            .iter()
            .filter_map(|k| self.identities.get(k).map(|id| (k.clone(), *id)))
            .collect())
    }

    fn fetch(
        &mut self,
        _namespace: &Namespace,
        ids: &[InternalId],
    ) -> StoreResult<Vec<StoredDocument>> {
        self.check(StoreCallKind::Fetch)?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.documents.get(id).map(|doc| StoredDocument {
                    id: *id,
                    document: doc.clone(),
                })
            })
            .collect())
    }

    fn delete(&mut self, _namespace: &Namespace, ids: &[InternalId]) -> StoreResult<usize> {
        self.check(StoreCallKind::Delete)?;
        let mut removed = 0;
        for id in ids {
            if self.documents.remove(id).is_some() {
                removed += 1;
            }
            self.identities.retain(|_, v| *v != *id);
        }
        Ok(removed)
    }

    fn insert(
        &mut self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<InternalId>> {
        self.check(StoreCallKind::Insert)?;
        let mut seen = HashSet::new();
        for doc in &documents {
            let key = doc
                .id()
                .ok_or_else(|| StoreError::validation("document without _id"))?;
            if !seen.insert(key) || self.identities.contains_key(key) {
                return Err(StoreError::UniqueViolation {
                    namespace: namespace.clone(),
                    key: key.clone(),
                });
            }
        }

        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = InternalId::new(self.next_id);
            self.next_id += 1;
            if let Some(key) = doc.id() {
                self.identities.insert(key.clone(), id);
            }
            self.documents.insert(id, doc);
            ids.push(id);
        }
        Ok(ids)
    }
}
