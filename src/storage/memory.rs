//! In-memory document store.
//!
//! Non-persistent implementation of [`DocumentStore`] for tests and dry
//! experiments. Commits apply under a single write lock, so a batch is
//! atomic with respect to readers.

use super::batch::WriteOperation;
use super::error::StoreError;
use super::traits::{DocumentRef, DocumentSnapshot, DocumentStore, check_collection_path};
use super::transforms::{commit_timestamp, render_set};
use crate::models::path::{self, SEPARATOR, segment_count};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

type Documents = BTreeMap<String, Map<String, Value>>;

/// In-memory store keyed by full document path.
///
/// # Example
///
/// ```rust,ignore
/// use firebulk::storage::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.insert("users/alice", serde_json::json!({"name": "Alice"}))?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
    commits: AtomicUsize,
    /// 1-based commit number to reject; 0 disables injection.
    fail_commit_at: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a document directly, bypassing batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a document path or `data` is not
    /// a JSON object.
    pub fn insert(&self, path: &str, data: Value) -> Result<(), StoreError> {
        let doc = DocumentRef::parse(path)?;
        let Value::Object(map) = data else {
            return Err(StoreError::Serialization {
                path: path.to_string(),
                cause: "document data must be an object".to_string(),
            });
        };
        self.write_lock()?.insert(doc.path().to_string(), map);
        Ok(())
    }

    /// Number of documents held, across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of commit attempts so far, failed ones included.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Rejects the `n`-th commit attempt (1-based) with
    /// [`StoreError::CommitRejected`].
    pub fn fail_commit_at(&self, n: usize) {
        self.fail_commit_at.store(n, Ordering::SeqCst);
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, Documents>, StoreError> {
        self.documents
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, Documents>, StoreError> {
        self.documents
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    /// Direct children of a collection, in key order.
    fn children<'a>(
        documents: &'a Documents,
        collection_path: &str,
    ) -> impl Iterator<Item = (&'a String, &'a Map<String, Value>)> {
        let prefix = format!("{collection_path}{SEPARATOR}");
        let depth = segment_count(collection_path) + 1;
        documents
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter(move |(key, _)| segment_count(key) == depth)
    }

    /// Names of collections nested directly below `prefix` (empty for root).
    fn collection_names(documents: &Documents, parent: &str) -> Vec<String> {
        let prefix = if parent.is_empty() {
            String::new()
        } else {
            format!("{parent}{SEPARATOR}")
        };
        documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| key[prefix.len()..].split(SEPARATOR).next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        check_collection_path(collection_path)?;
        let documents = self.read_lock()?;
        Ok(Self::children(&documents, collection_path)
            .map(|(key, data)| DocumentSnapshot {
                id: path::last_segment(key).to_string(),
                path: key.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn list_subcollection_names(
        &self,
        document_path: &str,
    ) -> Result<Vec<String>, StoreError> {
        let doc = DocumentRef::parse(document_path)?;
        let documents = self.read_lock()?;
        Ok(Self::collection_names(&documents, doc.path()))
    }

    async fn get_documents_page(
        &self,
        collection_path: &str,
        limit: usize,
    ) -> Result<Vec<DocumentRef>, StoreError> {
        check_collection_path(collection_path)?;
        let documents = self.read_lock()?;
        Self::children(&documents, collection_path)
            .take(limit)
            .map(|(key, _)| DocumentRef::parse(key))
            .collect()
    }

    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        let doc = DocumentRef::parse(path)?;
        let documents = self.read_lock()?;
        Ok(documents.get(doc.path()).map(|data| DocumentSnapshot {
            id: doc.id().to_string(),
            path: doc.path().to_string(),
            data: data.clone(),
        }))
    }

    async fn list_collections(&self, parent: Option<&str>) -> Result<Vec<String>, StoreError> {
        match parent {
            Some(document_path) => self.list_subcollection_names(document_path).await,
            None => Ok(Self::collection_names(&*self.read_lock()?, "")),
        }
    }

    async fn commit_writes(&self, writes: Vec<WriteOperation>) -> Result<(), StoreError> {
        let attempt = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_commit_at.load(Ordering::SeqCst) == attempt {
            return Err(StoreError::CommitRejected {
                cause: format!("injected failure on commit {attempt}"),
            });
        }

        let now = commit_timestamp();
        let mut documents = self.write_lock()?;

        // Render everything against an overlay first so a failing write
        // leaves the store untouched.
        let mut overlay: BTreeMap<String, Option<Map<String, Value>>> = BTreeMap::new();
        for write in &writes {
            let key = write.doc().path();
            match write {
                WriteOperation::Set { data, .. } => {
                    let previous = match overlay.get(key) {
                        Some(staged) => staged.as_ref(),
                        None => documents.get(key),
                    };
                    let rendered = render_set(key, previous, data, &now)?;
                    overlay.insert(key.to_string(), Some(rendered));
                },
                WriteOperation::Delete { .. } => {
                    overlay.insert(key.to_string(), None);
                },
            }
        }

        for (key, staged) in overlay {
            match staged {
                Some(data) => {
                    documents.insert(key, data);
                },
                None => {
                    documents.remove(&key);
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value::map_from_json;
    use crate::models::{FieldMap, FieldTransform, FieldValue};
    use serde_json::json;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("users/alice", json!({"name": "Alice"})).unwrap();
        store.insert("users/bob", json!({"name": "Bob"})).unwrap();
        store
            .insert("users/alice/orders/o1", json!({"total": 3}))
            .unwrap();
        store
            .insert("users/alice/notes/n1", json!({"text": "hi"}))
            .unwrap();
        store.insert("teams/t1", json!({})).unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_all_documents_direct_children_only() {
        let store = seeded();
        let docs = store.get_all_documents("users").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_list_subcollections_and_roots() {
        let store = seeded();
        let subs = store.list_subcollection_names("users/alice").await.unwrap();
        assert_eq!(subs, vec!["notes", "orders"]);
        assert!(store.list_subcollection_names("users/bob").await.unwrap().is_empty());
        assert_eq!(
            store.list_collections(None).await.unwrap(),
            vec!["teams", "users"]
        );
    }

    #[tokio::test]
    async fn test_page_respects_limit() {
        let store = seeded();
        let page = store.get_documents_page("users", 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].path(), "users/alice");
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = seeded();
        let good = DocumentRef::parse("users/carol").unwrap();
        let bad = DocumentRef::parse("users/dave").unwrap();
        let store_ref: &dyn DocumentStore = &store;
        let mut batch = store_ref.batch();
        batch.set(&good, map_from_json(json!({"ok": true}).as_object().cloned().unwrap()));
        batch.set(
            &bad,
            FieldMap::from([(
                "list".to_string(),
                FieldValue::Array(vec![FieldValue::Transform(FieldTransform::DeleteField)]),
            )]),
        );
        assert!(batch.commit().await.is_err());
        assert!(store.get_document("users/carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_commit_failure() {
        let store = MemoryStore::new();
        store.fail_commit_at(2);
        let store_ref: &dyn DocumentStore = &store;
        let doc = DocumentRef::parse("c/a").unwrap();

        let mut first = store_ref.batch();
        first.delete(&doc);
        assert!(first.commit().await.is_ok());

        let second = store_ref.batch();
        assert!(matches!(
            second.commit().await,
            Err(StoreError::CommitRejected { .. })
        ));
        assert_eq!(store.commit_count(), 2);
    }
}
