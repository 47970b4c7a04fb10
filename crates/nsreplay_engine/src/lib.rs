//! # nsreplay Engine
//!
//! Namespace batch replay for operation-log replication.
//!
//! Given the classified operations destined for one (database, collection)
//! pair, the engine resolves each operation's target document inside the
//! store, rejects batches whose operations cannot be matched, and then
//! deletes and inserts documents so the whole batch lands atomically in one
//! store transaction.
//!
//! This crate provides:
//! - [`ReplayOp`] and the per-kind behavior table ([`OpKind::behavior`])
//! - [`NamespaceBatch`], log-ordered operations for one namespace
//! - [`BatchExecutor`], the four-phase apply algorithm
//! - [`NamespaceReplayer`], transaction-per-batch replay against a [`DocumentStore`]
//! - [`ReplayReporter`] hooks and [`ReplayStats`] counters
//!
//! ## Usage
//!
//! ```
//! use nsreplay_doc::Document;
//! use nsreplay_engine::{BatchExecutor, Modification, NamespaceBatch, ReplayOp, UpdateAction};
//! use nsreplay_store::{DocumentStore, MemoryStore, Namespace};
//!
//! let store = MemoryStore::new();
//! let ns = Namespace::new("app", "users");
//! let executor = BatchExecutor::new();
//!
//! let batch = NamespaceBatch::new(
//!     ns.clone(),
//!     vec![
//!         ReplayOp::insert(Document::with_id(1).field("name", "alice")),
//!         ReplayOp::insert(Document::with_id(2).field("name", "bob")),
//!     ],
//! );
//! let mut txn = store.begin().unwrap();
//! executor.apply(&batch, &mut txn, false).unwrap();
//! store.commit(&mut txn).unwrap();
//!
//! let batch = NamespaceBatch::new(
//!     ns.clone(),
//!     vec![
//!         ReplayOp::update(1, UpdateAction::Modify(vec![Modification::set("admin", true)])),
//!         ReplayOp::delete(2),
//!     ],
//! );
//! let mut txn = store.begin().unwrap();
//! let outcome = executor.apply(&batch, &mut txn, false).unwrap();
//! store.commit(&mut txn).unwrap();
//!
//! assert_eq!(outcome.deleted, 2);
//! assert_eq!(store.count(&ns), 1);
//! ```
//!
//! [`DocumentStore`]: nsreplay_store::DocumentStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod error;
mod executor;
mod op;
mod replayer;
mod report;
mod update;

pub use batch::NamespaceBatch;
pub use config::ExecutorConfig;
pub use error::{Mismatch, ReplayError, ReplayErrorKind, ReplayResult};
pub use executor::{ApplyOutcome, BatchExecutor};
pub use op::{OpBehavior, OpKind, ReplayOp, Resolution};
pub use replayer::NamespaceReplayer;
pub use report::{NoopReporter, ReplayReporter, ReplayStats, ReplayStatsSnapshot};
pub use update::{Modification, UpdateAction};
