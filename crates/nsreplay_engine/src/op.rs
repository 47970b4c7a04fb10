//! The operation model.
//!
//! Every replayed operation is a [`ReplayOp`]. What the executor does with
//! an operation is decided entirely by its [`OpKind`]'s [`OpBehavior`] plus
//! [`ReplayOp::compute_result`]; the executor never matches on variants.

use crate::update::UpdateAction;
use nsreplay_doc::{Document, Value};
use std::fmt;

static MISSING_KEY: Value = Value::Null;

/// When an operation's target identity is looked up in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Never looked up.
    Never,
    /// Looked up in standard replay.
    Always,
    /// Looked up only in optimistic replay.
    OptimisticOnly,
}

/// Fixed replay metadata for an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpBehavior {
    /// When the target identity is resolved.
    pub resolution: Resolution,
    /// Fails the batch if the identity is not resolved.
    pub needs_match: bool,
    /// Needs the prior document to compute its result.
    pub needs_fetch: bool,
    /// Deletes the resolved document, if any.
    pub causes_deletion: bool,
}

impl OpBehavior {
    /// Returns true if the identity is looked up in the given mode.
    ///
    /// Optimistic replay resolves only `OptimisticOnly` kinds; standard
    /// replay resolves only `Always` kinds.
    #[must_use]
    pub const fn resolves(&self, optimistic: bool) -> bool {
        match self.resolution {
            Resolution::Never => false,
            Resolution::Always => !optimistic,
            Resolution::OptimisticOnly => optimistic,
        }
    }
}

/// Operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    /// Does nothing.
    Noop,
    /// Inserts a new document.
    Insert,
    /// Rewrites an existing document.
    Update,
    /// Rewrites a document, creating it if absent.
    Upsert,
    /// Deletes a document.
    Delete,
    /// Creates a document, replacing any stale one with the same `_id`.
    DeleteCreate,
    /// A log entry the classifier could not turn into a usable operation.
    Error,
}

impl OpKind {
    /// All kinds.
    pub const ALL: [OpKind; 7] = [
        OpKind::Noop,
        OpKind::Insert,
        OpKind::Update,
        OpKind::Upsert,
        OpKind::Delete,
        OpKind::DeleteCreate,
        OpKind::Error,
    ];

    /// Returns the behavior table row for this kind.
    #[must_use]
    pub const fn behavior(self) -> OpBehavior {
        let (resolution, needs_match, needs_fetch, causes_deletion) = match self {
            OpKind::Noop => (Resolution::Never, false, false, false),
            OpKind::Insert => (Resolution::Never, false, false, false),
            OpKind::Update => (Resolution::Always, true, true, true),
            OpKind::Upsert => (Resolution::Always, false, true, true),
            OpKind::Delete => (Resolution::Always, true, false, true),
            OpKind::DeleteCreate => (Resolution::OptimisticOnly, false, false, true),
            OpKind::Error => (Resolution::Never, true, false, false),
        };
        OpBehavior {
            resolution,
            needs_match,
            needs_fetch,
            causes_deletion,
        }
    }

    /// Returns the log-style name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OpKind::Noop => "NOOP",
            OpKind::Insert => "INSERT",
            OpKind::Update => "UPDATE",
            OpKind::Upsert => "UPSERT",
            OpKind::Delete => "DELETE",
            OpKind::DeleteCreate => "DELETE_CREATE",
            OpKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified operation ready for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOp {
    /// An entry with no effect on the store.
    Noop {
        /// External identifier.
        key: Value,
    },
    /// Inserts `document`. Its `_id` is the external identifier.
    Insert {
        /// The new document.
        document: Document,
    },
    /// Updates the document with `_id == key`.
    Update {
        /// External identifier.
        key: Value,
        /// How to derive the new version.
        action: UpdateAction,
    },
    /// Updates the document with `_id == key`, starting from `{_id}` if absent.
    Upsert {
        /// External identifier.
        key: Value,
        /// How to derive the new version.
        action: UpdateAction,
    },
    /// Deletes the document with `_id == key`.
    Delete {
        /// External identifier.
        key: Value,
    },
    /// Writes `document`, replacing a stored one with the same `_id`.
    DeleteCreate {
        /// The new document.
        document: Document,
    },
    /// An unusable log entry.
    Error {
        /// External identifier.
        key: Value,
        /// Why the entry could not be classified.
        reason: String,
    },
}

impl ReplayOp {
    /// Creates a no-op.
    pub fn noop(key: impl Into<Value>) -> Self {
        Self::Noop { key: key.into() }
    }

    /// Creates an insert.
    pub fn insert(document: Document) -> Self {
        Self::Insert { document }
    }

    /// Creates an update.
    pub fn update(key: impl Into<Value>, action: UpdateAction) -> Self {
        Self::Update {
            key: key.into(),
            action,
        }
    }

    /// Creates an upsert.
    pub fn upsert(key: impl Into<Value>, action: UpdateAction) -> Self {
        Self::Upsert {
            key: key.into(),
            action,
        }
    }

    /// Creates a delete.
    pub fn delete(key: impl Into<Value>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Creates a delete-create.
    pub fn delete_create(document: Document) -> Self {
        Self::DeleteCreate { document }
    }

    /// Creates an error entry.
    pub fn error(key: impl Into<Value>, reason: impl Into<String>) -> Self {
        Self::Error {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the operation's tag.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            ReplayOp::Noop { .. } => OpKind::Noop,
            ReplayOp::Insert { .. } => OpKind::Insert,
            ReplayOp::Update { .. } => OpKind::Update,
            ReplayOp::Upsert { .. } => OpKind::Upsert,
            ReplayOp::Delete { .. } => OpKind::Delete,
            ReplayOp::DeleteCreate { .. } => OpKind::DeleteCreate,
            ReplayOp::Error { .. } => OpKind::Error,
        }
    }

    /// Returns the behavior of this operation's kind.
    #[must_use]
    pub fn behavior(&self) -> OpBehavior {
        self.kind().behavior()
    }

    /// Returns the external identifier.
    ///
    /// Documents without `_id` report `Null`.
    pub fn key(&self) -> &Value {
        match self {
            ReplayOp::Insert { document } | ReplayOp::DeleteCreate { document } => {
                document.id().unwrap_or(&MISSING_KEY)
            }
            ReplayOp::Noop { key }
            | ReplayOp::Update { key, .. }
            | ReplayOp::Upsert { key, .. }
            | ReplayOp::Delete { key }
            | ReplayOp::Error { key, .. } => key,
        }
    }

    /// Computes the document to insert, given the prior stored version.
    ///
    /// `None` means the operation inserts nothing. An update whose prior
    /// document is unavailable also yields `None`: the document vanished
    /// between resolution and fetch.
    pub fn compute_result(&self, prior: Option<&Document>) -> Option<Document> {
        match self {
            ReplayOp::Insert { document } | ReplayOp::DeleteCreate { document } => {
                Some(document.clone())
            }
            ReplayOp::Update { key, action } => prior.map(|p| action.apply(p, key)),
            ReplayOp::Upsert { key, action } => Some(match prior {
                Some(p) => action.apply(p, key),
                None => action.apply(&Document::with_id(key.clone()), key),
            }),
            ReplayOp::Noop { .. } | ReplayOp::Delete { .. } | ReplayOp::Error { .. } => None,
        }
    }

    /// Explains why this operation fails when its identity is not resolved.
    pub fn mismatch_message(&self) -> String {
        match self {
            ReplayOp::Update { key, .. } => format!("no document with _id {key} to update"),
            ReplayOp::Delete { key } => format!("no document with _id {key} to delete"),
            ReplayOp::Error { reason, .. } => reason.clone(),
            other => format!("{} on _id {} has no match", other.kind(), other.key()),
        }
    }
}

impl fmt::Display for ReplayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::Modification;

    #[test]
    fn behavior_matrix() {
        let update = OpKind::Update.behavior();
        assert_eq!(update.resolution, Resolution::Always);
        assert!(update.needs_match && update.needs_fetch && update.causes_deletion);

        let insert = OpKind::Insert.behavior();
        assert_eq!(insert.resolution, Resolution::Never);
        assert!(!insert.needs_match && !insert.needs_fetch && !insert.causes_deletion);

        let delete = OpKind::Delete.behavior();
        assert!(delete.needs_match && !delete.needs_fetch && delete.causes_deletion);

        let dc = OpKind::DeleteCreate.behavior();
        assert_eq!(dc.resolution, Resolution::OptimisticOnly);
        assert!(!dc.needs_match && !dc.needs_fetch && dc.causes_deletion);
    }

    #[test]
    fn resolution_by_mode() {
        assert!(OpKind::Update.behavior().resolves(false));
        assert!(!OpKind::Update.behavior().resolves(true));
        assert!(OpKind::DeleteCreate.behavior().resolves(true));
        assert!(!OpKind::DeleteCreate.behavior().resolves(false));

        for kind in OpKind::ALL {
            assert_eq!(
                kind.behavior().resolves(true),
                kind == OpKind::DeleteCreate,
                "{kind}"
            );
        }
    }

    #[test]
    fn insert_ignores_prior() {
        let doc = Document::with_id(1).field("v", "new");
        let op = ReplayOp::insert(doc.clone());
        let stale = Document::with_id(1).field("v", "old");

        assert_eq!(op.compute_result(Some(&stale)), Some(doc.clone()));
        assert_eq!(op.compute_result(None), Some(doc));
    }

    #[test]
    fn update_without_prior_is_none() {
        let op = ReplayOp::update(
            1,
            UpdateAction::Modify(vec![Modification::set("v", 2)]),
        );
        assert_eq!(op.compute_result(None), None);

        let prior = Document::with_id(1).field("v", 1).field("w", 0);
        let out = op.compute_result(Some(&prior)).unwrap();
        assert_eq!(out, Document::with_id(1).field("v", 2).field("w", 0));
    }

    #[test]
    fn upsert_starts_from_key() {
        let op = ReplayOp::upsert(
            "k",
            UpdateAction::Modify(vec![Modification::increment("n", 1)]),
        );
        assert_eq!(
            op.compute_result(None),
            Some(Document::with_id("k").field("n", 1))
        );
    }

    #[test]
    fn delete_like_kinds_produce_nothing() {
        let prior = Document::with_id(1);
        assert_eq!(ReplayOp::delete(1).compute_result(Some(&prior)), None);
        assert_eq!(ReplayOp::noop(1).compute_result(Some(&prior)), None);
        assert_eq!(ReplayOp::error(1, "bad").compute_result(None), None);
    }

    #[test]
    fn keys() {
        assert_eq!(ReplayOp::insert(Document::with_id(3)).key(), &Value::Int(3));
        assert_eq!(ReplayOp::insert(Document::new()).key(), &Value::Null);
        assert_eq!(ReplayOp::delete("x").key(), &Value::from("x"));
    }

    #[test]
    fn mismatch_messages() {
        assert_eq!(
            ReplayOp::delete(7).mismatch_message(),
            "no document with _id 7 to delete"
        );
        assert_eq!(
            ReplayOp::error(7, "unparseable entry").mismatch_message(),
            "unparseable entry"
        );
        assert_eq!(ReplayOp::delete(7).to_string(), "DELETE(7)");
    }
}
