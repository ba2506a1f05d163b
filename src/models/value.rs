//! Store-native write values.
//!
//! A [`FieldValue`] tree is what a write batch stages: ordinary JSON data
//! plus [`FieldTransform`] tokens that the store evaluates at commit time.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Fields of a document staged for writing.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A value staged for a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (integer or float).
    Number(Number),
    /// String.
    String(String),
    /// Ordered sequence.
    Array(Vec<FieldValue>),
    /// String-keyed map.
    Map(FieldMap),
    /// Mutation evaluated by the store when the batch commits.
    Transform(FieldTransform),
}

/// Store-side field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTransform {
    /// Set the field to the commit time.
    ServerTimestamp,
    /// Add the operand to the current numeric value.
    Increment(Number),
    /// Append each element not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each element.
    ArrayRemove(Vec<Value>),
    /// Remove the field.
    DeleteField,
}

impl FieldTransform {
    /// Short name used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ServerTimestamp => "serverTimestamp",
            Self::Increment(_) => "increment",
            Self::ArrayUnion(_) => "arrayUnion",
            Self::ArrayRemove(_) => "arrayRemove",
            Self::DeleteField => "delete",
        }
    }
}

impl FieldValue {
    /// Returns `true` if no transform appears anywhere in the tree.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        match self {
            Self::Transform(_) => false,
            Self::Array(items) => items.iter().all(Self::is_plain),
            Self::Map(fields) => fields.values().all(Self::is_plain),
            _ => true,
        }
    }

    /// Converts a transform-free tree back to JSON.
    ///
    /// Returns `None` if a transform is present.
    #[must_use]
    pub fn to_plain(&self) -> Option<Value> {
        Some(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => {
                Value::Array(items.iter().map(Self::to_plain).collect::<Option<_>>()?)
            },
            Self::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| v.to_plain().map(|v| (k.clone(), v)))
                    .collect::<Option<Map<_, _>>>()?,
            ),
            Self::Transform(_) => return None,
        })
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map_from_json(map)),
        }
    }
}

/// Converts a JSON object into a transform-free [`FieldMap`].
#[must_use]
pub fn map_from_json(map: Map<String, Value>) -> FieldMap {
    map.into_iter()
        .map(|(k, v)| (k, FieldValue::from(v)))
        .collect()
}

/// Field path of the first transform that is itself an array element.
///
/// Stores evaluate transforms only at map fields, so such a tree cannot be
/// committed. Maps inside arrays are fields again and may hold transforms.
#[must_use]
pub fn find_transform_in_array(fields: &FieldMap) -> Option<String> {
    fields
        .iter()
        .find_map(|(key, value)| array_transform_at(value, key, false))
}

fn array_transform_at(value: &FieldValue, path: &str, in_array: bool) -> Option<String> {
    match value {
        FieldValue::Transform(_) if in_array => Some(path.to_string()),
        FieldValue::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| array_transform_at(item, &format!("{path}[{i}]"), true)),
        FieldValue::Map(fields) => fields
            .iter()
            .find_map(|(key, item)| array_transform_at(item, &format!("{path}.{key}"), false)),
        _ => None,
    }
}
