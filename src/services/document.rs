//! Single-document reads and writes.

use crate::services::sentinel::SentinelResolver;
use crate::storage::{DocumentSnapshot, DocumentStore};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Service behind the `get`, `set` and `list` commands.
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    resolver: SentinelResolver,
}

impl DocumentService {
    /// Creates a new document service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            resolver: SentinelResolver::new(),
        }
    }

    /// Reads one document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] for an invalid path or a failed read.
    pub async fn get(&self, path: &str) -> Result<Option<DocumentSnapshot>> {
        Ok(self.store.get_document(path).await?)
    }

    /// Replaces a document with `data`, resolving sentinel markers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `data` is not an object,
    /// [`Error::Resolve`] for a malformed sentinel and [`Error::Store`] for
    /// an invalid path or a rejected commit.
    pub async fn set(&self, path: &str, data: &Value) -> Result<()> {
        let Value::Object(fields) = data else {
            return Err(Error::InvalidInput(
                "document data must be a JSON object".to_string(),
            ));
        };
        let doc = self.store.resolve_document_ref(path)?;
        let fields = self.resolver.resolve_document(fields)?;
        let mut batch = self.store.batch();
        batch.set(&doc, fields);
        batch.commit().await?;
        tracing::debug!(path, "Document written");
        Ok(())
    }

    /// Lists root collections, or the subcollections of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] for an invalid path or a failed read.
    pub async fn list(&self, parent: Option<&str>) -> Result<Vec<String>> {
        Ok(self.store.list_collections(parent).await?)
    }

    /// Reads a document's fields, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub async fn get_data(&self, path: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self.get(path).await?.map(|snapshot| snapshot.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_resolves_sentinels() {
        let store = Arc::new(MemoryStore::new());
        store.insert("posts/p1", json!({"likes": 2, "tags": ["a"]})).unwrap();
        let service = DocumentService::new(store);

        service
            .set(
                "posts/p1",
                &json!({
                    "likes": {"kind": "increment", "operand": 1},
                    "tags": {"kind": "arrayUnion", "elements": ["b"]},
                    "updated": {"kind": "serverTimestamp"},
                    "draft": {"kind": "delete"}
                }),
            )
            .await
            .unwrap();

        let data = service.get_data("posts/p1").await.unwrap().unwrap();
        assert_eq!(data["likes"], json!(3));
        assert_eq!(data["tags"], json!(["a", "b"]));
        assert!(data["updated"].as_str().unwrap().ends_with('Z'));
        assert!(!data.contains_key("draft"));
    }

    #[tokio::test]
    async fn test_set_rejects_bad_input() {
        let service = DocumentService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.set("posts/p1", &json!([1])).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            service.set("posts", &json!({})).await,
            Err(Error::Store(_))
        ));
        assert!(matches!(
            service
                .set("posts/p1", &json!({"n": {"kind": "increment", "operand": "x"}}))
                .await,
            Err(Error::Resolve(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let store = Arc::new(MemoryStore::new());
        store.insert("users/alice", json!({"n": 1})).unwrap();
        store.insert("users/alice/orders/o1", json!({})).unwrap();
        store.insert("teams/t1", json!({})).unwrap();
        let service = DocumentService::new(store);

        assert!(service.get("users/bob").await.unwrap().is_none());
        assert_eq!(service.get("users/alice").await.unwrap().unwrap().id, "alice");
        assert_eq!(service.list(None).await.unwrap(), vec!["teams", "users"]);
        assert_eq!(
            service.list(Some("users/alice")).await.unwrap(),
            vec!["orders"]
        );
    }
}
