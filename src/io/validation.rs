//! Manifest validation.
//!
//! Checks the shape of an import manifest before anything is written, so a
//! malformed file is rejected without touching the store.

use super::services::import::ImportError;
use crate::models::{DocumentRecord, ImportManifest};
use serde_json::Value;

/// Parses and validates manifest text.
///
/// # Errors
///
/// Returns [`ImportError::StructureError`] when the text is not JSON, the
/// root is not an object, `documents` is not an array, or any record (at
/// any nesting level) lacks a string `id`, a string `path`, or an object
/// `data`. The reported index is that of the top-level record.
pub fn parse_manifest(text: &str) -> Result<ImportManifest, ImportError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| ImportError::structure(None, format!("invalid JSON: {e}")))?;
    validate_manifest(root)
}

/// Validates an already-parsed manifest value.
///
/// # Errors
///
/// See [`parse_manifest`].
pub fn validate_manifest(root: Value) -> Result<ImportManifest, ImportError> {
    let Value::Object(mut root) = root else {
        return Err(ImportError::structure(
            None,
            "manifest must be a JSON object",
        ));
    };
    let documents = match root.remove("documents") {
        Some(Value::Array(documents)) => documents,
        Some(other) => {
            return Err(ImportError::structure(
                None,
                format!("'documents' must be an array, found {}", kind_of(&other)),
            ));
        },
        None => {
            return Err(ImportError::structure(
                None,
                "missing required field 'documents'",
            ));
        },
    };

    let mut records = Vec::with_capacity(documents.len());
    for (index, document) in documents.into_iter().enumerate() {
        validate_record(&document, "")
            .map_err(|message| ImportError::structure(Some(index), message))?;
        let record: DocumentRecord = serde_json::from_value(document)
            .map_err(|e| ImportError::structure(Some(index), e.to_string()))?;
        records.push(record);
    }
    Ok(ImportManifest::new(records))
}

/// Checks one record and its nested records; `prefix` locates nested ones.
fn validate_record(value: &Value, prefix: &str) -> Result<(), String> {
    let Value::Object(fields) = value else {
        return Err(format!("{prefix}record must be an object, found {}", kind_of(value)));
    };
    for key in ["id", "path"] {
        match fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => {},
            Some(Value::String(_)) => return Err(format!("{prefix}'{key}' must not be empty")),
            Some(other) => {
                return Err(format!(
                    "{prefix}'{key}' must be a string, found {}",
                    kind_of(other)
                ));
            },
            None => return Err(format!("{prefix}missing required field '{key}'")),
        }
    }
    match fields.get("data") {
        Some(Value::Object(_)) => {},
        Some(other) => {
            return Err(format!(
                "{prefix}'data' must be an object, found {}",
                kind_of(other)
            ));
        },
        None => return Err(format!("{prefix}missing required field 'data'")),
    }

    match fields.get("subcollections") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(subcollections)) => {
            for (name, records) in subcollections {
                let Value::Array(records) = records else {
                    return Err(format!(
                        "{prefix}subcollection '{name}' must be an array, found {}",
                        kind_of(records)
                    ));
                };
                for (i, record) in records.iter().enumerate() {
                    validate_record(record, &format!("{prefix}{name}[{i}]: "))?;
                }
            }
            Ok(())
        },
        Some(other) => Err(format!(
            "{prefix}'subcollections' must be an object, found {}",
            kind_of(other)
        )),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
