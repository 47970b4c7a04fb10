//! Property-based test generators using proptest.

use nsreplay_doc::{Document, Value};
use proptest::prelude::*;

/// Strategy for external identifiers.
///
/// Draws from a small space so generated batches share keys often.
pub fn key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (0i32..16).prop_map(Value::Int),
        1 => prop::string::string_regex("k[a-d]").expect("Invalid regex").prop_map(Value::Text),
    ]
}

/// Strategy for field names. Never produces `_id`.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex")
}

/// Strategy for non-container values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        prop::string::string_regex("[ -~]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for values, nesting arrays and documents up to a few levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((field_name_strategy(), inner), 0..4)
                .prop_map(|fields| Value::Document(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for documents carrying `key` as `_id`.
pub fn document_for_key(key: Value) -> impl Strategy<Value = Document> {
    prop::collection::vec((field_name_strategy(), value_strategy()), 0..4).prop_map(
        move |fields| {
            let mut doc: Document = fields.into_iter().collect();
            doc.set_id(key.clone());
            doc
        },
    )
}

/// Strategy for documents with a generated `_id`.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    key_strategy().prop_flat_map(document_for_key)
}
