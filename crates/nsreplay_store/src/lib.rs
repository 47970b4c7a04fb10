//! # nsreplay Store
//!
//! The transactional document store capability used by the nsreplay engine.
//!
//! This crate provides:
//! - [`StoreTransaction`], the four batched primitives the engine needs
//!   (resolve identities, fetch, delete, insert)
//! - [`DocumentStore`], transaction lifecycle with a commit-or-rollback helper
//! - [`StoreError`] with a coarse [`StoreErrorKind`] classification
//! - [`MemoryStore`], an in-memory reference store with a unique `_id`
//!   index and first-committer-wins conflict detection
//!
//! ## Usage
//!
//! ```
//! use nsreplay_doc::{Document, Value};
//! use nsreplay_store::{DocumentStore, MemoryStore, Namespace, StoreTransaction};
//!
//! let store = MemoryStore::new();
//! let ns = Namespace::new("app", "users");
//!
//! let mut txn = store.begin().unwrap();
//! txn.insert(&ns, vec![Document::with_id(7)]).unwrap();
//! store.commit(&mut txn).unwrap();
//!
//! let mut txn = store.begin().unwrap();
//! let found = txn.resolve_identities(&ns, &[Value::Int(7)]).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capability;
mod config;
mod error;
mod memory;
mod types;

pub use capability::{DocumentStore, StoreTransaction};
pub use config::StoreConfig;
pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use memory::{MemoryStore, MemoryTransaction, TransactionState};
pub use types::{CommitSeq, InternalId, Namespace, StoredDocument, TransactionId};
