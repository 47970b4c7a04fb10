//! # nsreplay Doc
//!
//! Document value model for nsreplay.
//!
//! This crate provides:
//! - [`Value`], a totally ordered, hashable document value (no floats)
//! - [`Document`], an ordered set of named fields with an `_id` identifier
//! - JSON conversion
//! - CBOR payload encoding for stores that keep documents as bytes
//!
//! ## Usage
//!
//! ```
//! use nsreplay_doc::{Document, Value};
//!
//! let doc = Document::from_json_str(r#"{"_id": 1, "name": "alice"}"#).unwrap();
//! assert_eq!(doc.id(), Some(&Value::Int(1)));
//!
//! let bytes = doc.to_cbor().unwrap();
//! assert_eq!(Document::from_cbor(&bytes).unwrap(), doc);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod document;
mod error;
mod json;
mod value;

pub use document::{Document, ID_FIELD};
pub use error::{DocError, DocResult};
pub use value::Value;
