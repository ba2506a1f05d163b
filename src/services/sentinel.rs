//! Sentinel resolution.
//!
//! Write payloads may embed data-shaped instructions such as
//! `{"kind": "increment", "operand": 1}`. [`SentinelResolver`] rebuilds the
//! payload as a [`FieldValue`] tree in which every such marker is replaced
//! by a store-native [`FieldTransform`].
//!
//! # Detection
//!
//! A map is a sentinel only if it parses as [`SentinelShape`]: a `kind` key
//! naming one of the five known kinds and no keys besides `kind`, `operand`
//! and `elements`. Anything else is ordinary data and is never an error.
//!
//! # Field paths
//!
//! Errors carry the location of the offending marker: dotted for object
//! keys, bracketed for array indices (`items[1].count`).

use crate::models::{FieldMap, FieldTransform, FieldValue};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum nesting depth accepted by the resolver.
pub const MAX_DEPTH: usize = 100;

/// Sentinel resolution errors. The first error encountered wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// `increment` without a numeric operand.
    #[error("invalid operand at '{path}': expected {expected}, got {actual}")]
    InvalidOperand {
        /// Field path of the sentinel.
        path: String,
        /// Expected operand type.
        expected: &'static str,
        /// Observed operand type (`missing`, `null`, `string`, ...).
        actual: &'static str,
    },

    /// `arrayUnion`/`arrayRemove` without an element sequence.
    #[error("invalid elements at '{path}': expected an array")]
    InvalidElements {
        /// Field path of the sentinel.
        path: String,
    },

    /// Unknown sentinel kind.
    #[error("invalid sentinel kind at '{path}': {value}")]
    InvalidSentinelKind {
        /// Field path of the sentinel.
        path: String,
        /// The unrecognised kind value.
        value: String,
    },

    /// Input nested deeper than [`MAX_DEPTH`].
    #[error("recursion limit of {MAX_DEPTH} exceeded at '{path}'")]
    RecursionLimitExceeded {
        /// Field path where the limit was hit.
        path: String,
    },
}

/// The five sentinel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SentinelKind {
    /// Set to the commit time.
    ServerTimestamp,
    /// Add a number.
    Increment,
    /// Append missing elements.
    ArrayUnion,
    /// Remove elements.
    ArrayRemove,
    /// Remove the field.
    Delete,
}

/// Structural shape of a sentinel marker.
///
/// Operand and elements are kept raw so that a recognised marker with a bad
/// payload is reported instead of silently treated as data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SentinelShape {
    /// Discriminator.
    pub kind: SentinelKind,
    #[serde(default)]
    operand: Option<Value>,
    #[serde(default)]
    elements: Option<Value>,
}

impl SentinelShape {
    /// Attempts to read a map as a sentinel; `None` means ordinary data.
    #[must_use]
    pub fn detect(map: &Map<String, Value>) -> Option<Self> {
        if !map.contains_key("kind") {
            return None;
        }
        let mut shape = Self::deserialize(&Value::Object(map.clone())).ok()?;
        // `Option<Value>` collapses an explicit null into `None`; keep the
        // distinction for error reporting.
        if shape.operand.is_none() && map.contains_key("operand") {
            shape.operand = Some(Value::Null);
        }
        if shape.elements.is_none() && map.contains_key("elements") {
            shape.elements = Some(Value::Null);
        }
        Some(shape)
    }
}

/// Replaces sentinel markers with store-native transforms.
///
/// The input is never mutated; on error no partial result is returned.
#[derive(Debug, Clone, Copy)]
pub struct SentinelResolver {
    max_depth: usize,
}

impl Default for SentinelResolver {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

impl SentinelResolver {
    /// Creates a resolver with the default depth limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a whole value tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolveError`] in depth-first key order.
    pub fn resolve(&self, value: &Value) -> Result<FieldValue, ResolveError> {
        self.resolve_at(value, "", 0)
    }

    /// Resolves a document body.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolveError`] in depth-first key order.
    pub fn resolve_document(&self, data: &Map<String, Value>) -> Result<FieldMap, ResolveError> {
        self.resolve_map(data, "", 0)
    }

    fn resolve_at(&self, value: &Value, path: &str, depth: usize) -> Result<FieldValue, ResolveError> {
        if depth > self.max_depth {
            return Err(ResolveError::RecursionLimitExceeded {
                path: path.to_string(),
            });
        }
        match value {
            Value::Object(map) => match SentinelShape::detect(map) {
                Some(shape) => Ok(FieldValue::Transform(dispatch(shape, path)?)),
                None => Ok(FieldValue::Map(self.resolve_map(map, path, depth)?)),
            },
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    resolved.push(self.resolve_at(item, &item_path, depth + 1)?);
                }
                Ok(FieldValue::Array(resolved))
            },
            scalar => Ok(FieldValue::from(scalar.clone())),
        }
    }

    fn resolve_map(
        &self,
        map: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<FieldMap, ResolveError> {
        let mut resolved = FieldMap::new();
        for (key, value) in map {
            let key_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            resolved.insert(key.clone(), self.resolve_at(value, &key_path, depth + 1)?);
        }
        Ok(resolved)
    }
}

fn dispatch(shape: SentinelShape, path: &str) -> Result<FieldTransform, ResolveError> {
    match shape.kind {
        SentinelKind::ServerTimestamp => Ok(FieldTransform::ServerTimestamp),
        SentinelKind::Delete => Ok(FieldTransform::DeleteField),
        SentinelKind::Increment => match shape.operand {
            Some(Value::Number(n)) => Ok(FieldTransform::Increment(n)),
            other => Err(ResolveError::InvalidOperand {
                path: path.to_string(),
                expected: "number",
                actual: describe(other.as_ref()),
            }),
        },
        SentinelKind::ArrayUnion | SentinelKind::ArrayRemove => {
            let Some(Value::Array(elements)) = shape.elements else {
                return Err(ResolveError::InvalidElements {
                    path: path.to_string(),
                });
            };
            Ok(if shape.kind == SentinelKind::ArrayUnion {
                FieldTransform::ArrayUnion(elements)
            } else {
                FieldTransform::ArrayRemove(elements)
            })
        },
    }
}

const fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Resolves a value with the default resolver.
///
/// # Errors
///
/// See [`SentinelResolver::resolve`].
pub fn resolve(value: &Value) -> Result<FieldValue, ResolveError> {
    SentinelResolver::new().resolve(value)
}
