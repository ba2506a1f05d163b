//! The store collaborator interface consumed by the bulk engine.

use super::batch::{WriteBatch, WriteOperation};
use super::error::StoreError;
use crate::models::path::{self, is_document_path};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A validated reference to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    path: String,
}

impl DocumentRef {
    /// Parses a document path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for malformed segments or a path
    /// with an odd segment count.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        path::validate_segments(path).map_err(|reason| StoreError::invalid_path(path, reason))?;
        if !is_document_path(path) {
            return Err(StoreError::invalid_path(
                path,
                "expected a document path (even number of segments)",
            ));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    /// Full slash path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Document ID.
    #[must_use]
    pub fn id(&self) -> &str {
        path::last_segment(&self.path)
    }

    /// Path of the collection containing this document.
    #[must_use]
    pub fn collection_path(&self) -> &str {
        path::parent(&self.path).unwrap_or_default()
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Document ID.
    pub id: String,
    /// Full slash path.
    pub path: String,
    /// Document fields.
    pub data: Map<String, Value>,
}

/// A hierarchical document store with atomic write batches.
///
/// Every method is a suspension point; callers issue them strictly one at a
/// time.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads every document directly inside a collection.
    async fn get_all_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError>;

    /// Lists the names of a document's subcollections.
    async fn list_subcollection_names(&self, document_path: &str)
    -> Result<Vec<String>, StoreError>;

    /// Returns up to `limit` document references from a collection.
    async fn get_documents_page(
        &self,
        collection_path: &str,
        limit: usize,
    ) -> Result<Vec<DocumentRef>, StoreError>;

    /// Reads a single document.
    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError>;

    /// Lists root collections (`parent == None`) or a document's subcollections.
    async fn list_collections(&self, parent: Option<&str>) -> Result<Vec<String>, StoreError> {
        match parent {
            Some(document_path) => self.list_subcollection_names(document_path).await,
            None => Err(StoreError::Backend(
                "listing root collections is not supported".to_string(),
            )),
        }
    }

    /// Applies every write or none of them.
    async fn commit_writes(&self, writes: Vec<WriteOperation>) -> Result<(), StoreError>;

    /// Resolves a document reference; may fail per document.
    fn resolve_document_ref(&self, path: &str) -> Result<DocumentRef, StoreError> {
        DocumentRef::parse(path)
    }
}

impl dyn DocumentStore + '_ {
    /// Opens an empty atomic write batch against this store.
    #[must_use]
    pub fn batch(&self) -> WriteBatch<'_> {
        WriteBatch::new(self)
    }
}

/// Validates a collection path for backends.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPath`] for malformed segments or an even
/// segment count.
pub fn check_collection_path(path: &str) -> Result<(), StoreError> {
    path::validate_segments(path).map_err(|reason| StoreError::invalid_path(path, reason))?;
    if is_document_path(path) {
        return Err(StoreError::invalid_path(
            path,
            "expected a collection path (odd number of segments)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ref_parse() {
        let doc = DocumentRef::parse("users/alice/orders/o1").unwrap();
        assert_eq!(doc.id(), "o1");
        assert_eq!(doc.collection_path(), "users/alice/orders");
        assert_eq!(doc.to_string(), "users/alice/orders/o1");
    }

    #[test]
    fn test_document_ref_rejects_collection_path() {
        let err = DocumentRef::parse("users").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert!(DocumentRef::parse("users//alice").is_err());
    }

    #[test]
    fn test_check_collection_path() {
        assert!(check_collection_path("users").is_ok());
        assert!(check_collection_path("users/alice/orders").is_ok());
        assert!(check_collection_path("users/alice").is_err());
        assert!(check_collection_path("").is_err());
    }
}
