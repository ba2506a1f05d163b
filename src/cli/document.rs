//! `get`, `set` and `list` CLI commands.

#![allow(clippy::print_stdout)]

use super::CliContext;
use crate::services::DocumentService;
use crate::storage::StoreError;
use crate::{Error, Result};
use serde_json::Value;

/// Prints one document as pretty JSON.
///
/// # Errors
///
/// Returns an error if the path is invalid or the document does not exist.
pub async fn get(context: &CliContext, path: &str) -> Result<()> {
    let service = DocumentService::new(context.store.clone());
    let data = service
        .get_data(path)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;
    println!("{}", to_pretty(&Value::Object(data))?);
    Ok(())
}

/// Replaces a document with the JSON object in `json`.
///
/// # Errors
///
/// Returns an error for malformed JSON, a malformed sentinel, or a failed
/// commit.
pub async fn set(context: &CliContext, path: &str, json: &str) -> Result<()> {
    let data: Value = serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("invalid JSON: {e}")))?;
    DocumentService::new(context.store.clone())
        .set(path, &data)
        .await?;
    println!("Document written: {path}");
    Ok(())
}

/// Lists root collections, or the subcollections of `parent`.
///
/// # Errors
///
/// Returns an error if the path is invalid or the store cannot be read.
pub async fn list(context: &CliContext, parent: Option<&str>) -> Result<()> {
    let names = DocumentService::new(context.store.clone())
        .list(parent)
        .await?;
    if names.is_empty() {
        println!("No collections found.");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::OperationFailed {
        operation: "encode_document".to_string(),
        cause: e.to_string(),
    })
}
