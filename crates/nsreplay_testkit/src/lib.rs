//! # nsreplay Testkit
//!
//! Test utilities for nsreplay.
//!
//! This crate provides:
//! - Store fixtures built on the in-memory store
//! - [`RecordingTransaction`] and [`RecordingStore`], which log every store call
//! - [`ScriptedTransaction`], a fake store with pinned ids and injectable failures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```
//! use nsreplay_store::{DocumentStore, StoreTransaction};
//! use nsreplay_testkit::prelude::*;
//!
//! let ns = test_namespace();
//! let store = seeded_store(&ns, numbered_documents(0..3));
//!
//! let mut txn = RecordingTransaction::new(store.begin().unwrap());
//! txn.resolve_identities(&ns, &[nsreplay_doc::Value::Int(1)]).unwrap();
//! assert_eq!(txn.kinds(), vec![StoreCallKind::Resolve]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;
pub mod scripted;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
    pub use crate::scripted::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
pub use scripted::*;
