//! CBOR payload encoding for stored documents.

use crate::document::Document;
use crate::error::{DocError, DocResult};

impl Document {
    /// Encodes the document as a CBOR payload.
    pub fn to_cbor(&self) -> DocResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| DocError::encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a document from a CBOR payload.
    pub fn from_cbor(bytes: &[u8]) -> DocResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| DocError::decoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn nested_document_survives_payload_encoding() {
        let doc = Document::with_id(Value::Long(1 << 40))
            .field("name", "alice")
            .field("raw", Value::Bytes(vec![0, 1, 2]))
            .field("inner", Document::new().field("n", Value::Null));

        let bytes = doc.to_cbor().unwrap();
        assert_eq!(Document::from_cbor(&bytes).unwrap(), doc);
    }

    #[test]
    fn truncated_payload_fails() {
        let bytes = Document::with_id(1).field("a", "b").to_cbor().unwrap();
        let err = Document::from_cbor(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, DocError::Decoding { .. }));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn any_value() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i32>().prop_map(Value::Int),
                any::<i64>().prop_map(Value::Long),
                "[ -~]{0,12}".prop_map(Value::Text),
                prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                        .prop_map(|fields| Value::Document(fields.into_iter().collect())),
                ]
            })
        }

        proptest! {
            // Unlike JSON, the payload keeps Int/Long, bytes and field order
            #[test]
            fn payload_preserves_every_value(
                key in any::<i64>(),
                fields in prop::collection::vec(("[a-z]{1,6}", any_value()), 0..6),
            ) {
                let mut doc: Document = fields.into_iter().collect();
                doc.set_id(Value::Long(key));

                let bytes = doc.to_cbor().unwrap();
                prop_assert_eq!(Document::from_cbor(&bytes).unwrap(), doc);
            }
        }
    }
}
