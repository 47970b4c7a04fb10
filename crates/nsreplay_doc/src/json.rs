//! JSON conversion.
//!
//! JSON integers become `Int` when they fit in 32 bits and `Long` otherwise.
//! Fractional numbers are rejected. Byte strings have no JSON form and are
//! written as arrays of integers, so that direction is lossy.

use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::value::Value;
use serde_json::Value as Json;

impl Value {
    /// Converts a JSON value.
    pub fn from_json(json: &Json) -> DocResult<Self> {
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(v) => match i32::try_from(v) {
                    Ok(small) => Value::Int(small),
                    Err(_) => Value::Long(v),
                },
                None => return Err(DocError::unsupported_number(n.to_string())),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<DocResult<Vec<_>>>()?,
            ),
            Json::Object(map) => {
                let mut doc = Document::new();
                for (k, v) in map {
                    doc.set(k.clone(), Value::from_json(v)?);
                }
                Value::Document(doc)
            }
        })
    }

    /// Converts to a JSON value.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Long(n) => Json::from(*n),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Document(doc) => doc.to_json(),
        }
    }
}

impl Document {
    /// Converts a JSON value that must be an object.
    pub fn from_json(json: &Json) -> DocResult<Self> {
        match Value::from_json(json)? {
            Value::Document(doc) => Ok(doc),
            other => Err(DocError::NotADocument {
                type_name: other.type_name(),
            }),
        }
    }

    /// Parses a JSON object from text.
    pub fn from_json_str(text: &str) -> DocResult<Self> {
        let json: Json =
            serde_json::from_str(text).map_err(|e| DocError::invalid_json(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Converts to a JSON object, preserving field order where the JSON map allows.
    pub fn to_json(&self) -> Json {
        let map = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Json::Object(map)
    }

    /// Renders as compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}
