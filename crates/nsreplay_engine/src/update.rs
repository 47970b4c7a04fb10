//! Update descriptions carried by update and upsert operations.

use nsreplay_doc::{Document, Value, ID_FIELD};

/// A change to a single top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Sets a field, replacing any existing value.
    Set {
        /// Field name.
        field: String,
        /// New value.
        value: Value,
    },
    /// Removes a field if present.
    Unset {
        /// Field name.
        field: String,
    },
    /// Adds to a numeric field. An absent field counts as zero.
    ///
    /// `Int` fields widen to `Long` when the sum leaves the 32-bit range.
    /// Sums saturate at the `i64` bounds. Non-numeric fields are left as they are.
    Increment {
        /// Field name.
        field: String,
        /// Amount to add.
        by: i64,
    },
}

impl Modification {
    /// Creates a `Set` modification.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an `Unset` modification.
    pub fn unset(field: impl Into<String>) -> Self {
        Self::Unset {
            field: field.into(),
        }
    }

    /// Creates an `Increment` modification.
    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        Self::Increment {
            field: field.into(),
            by,
        }
    }

    fn apply_to(&self, doc: &mut Document) {
        match self {
            Modification::Set { field, value } => {
                doc.set(field.clone(), value.clone());
            }
            Modification::Unset { field } => {
                doc.remove(field);
            }
            Modification::Increment { field, by } => {
                let next = match doc.get(field) {
                    None => narrow(*by),
                    Some(Value::Int(n)) => narrow(i64::from(*n).saturating_add(*by)),
                    Some(Value::Long(n)) => Value::Long(n.saturating_add(*by)),
                    Some(_) => return,
                };
                doc.set(field.clone(), next);
            }
        }
    }
}

fn narrow(n: i64) -> Value {
    match i32::try_from(n) {
        Ok(small) => Value::Int(small),
        Err(_) => Value::Long(n),
    }
}

/// How an update produces the new version of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Replaces the whole document.
    Replace(Document),
    /// Applies field modifications in order.
    Modify(Vec<Modification>),
}

impl UpdateAction {
    /// Produces the updated document.
    ///
    /// The result always carries `key` as its `_id`, in first position,
    /// whatever the replacement or modifications say.
    pub fn apply(&self, prior: &Document, key: &Value) -> Document {
        let mut doc = match self {
            UpdateAction::Replace(replacement) => replacement.clone(),
            UpdateAction::Modify(mods) => {
                let mut doc = prior.clone();
                for m in mods.iter().filter(|m| !m.targets_id()) {
                    m.apply_to(&mut doc);
                }
                doc
            }
        };
        doc.set_id(key.clone());
        doc
    }
}

impl Modification {
    fn targets_id(&self) -> bool {
        let field = match self {
            Modification::Set { field, .. }
            | Modification::Unset { field }
            | Modification::Increment { field, .. } => field,
        };
        field == ID_FIELD
    }
}
