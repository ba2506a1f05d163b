//! Recursive deletion of collections and documents.
//!
//! Deletes page by page. For each page, every document's subcollections
//! are removed first, then the page itself in one batch. Batches are
//! independent; a failure stops the walk and leaves earlier pages deleted.

use crate::config::BatchLimits;
use crate::models::path;
use crate::storage::{DocumentRef, DocumentStore, StoreError};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::instrument;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Deletion failures.
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    /// A store read or batch commit failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Page size of zero.
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Options for a delete.
#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    /// Documents fetched (and deleted) per batch.
    pub page_size: usize,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self::from_limits(&BatchLimits::default())
    }
}

impl DeleteOptions {
    /// Uses the configured delete page size.
    #[must_use]
    pub const fn from_limits(limits: &BatchLimits) -> Self {
        Self {
            page_size: limits.delete_page_size,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Documents deleted at every level.
    pub deleted_count: usize,
    /// `false` when the confirmation gate declined.
    pub confirmed: bool,
}

/// Service for deleting collection trees.
pub struct DeleteService {
    store: Arc<dyn DocumentStore>,
}

impl DeleteService {
    /// Creates a new delete service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Deletes a collection and everything below it.
    ///
    /// `confirm` is asked exactly once with the collection path; declining
    /// returns without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::Store`] for an invalid path or a failed read or
    /// commit, and [`DeleteError::InvalidPageSize`] for a zero page size.
    #[instrument(name = "firebulk.delete_collection", skip(self, confirm, options))]
    pub async fn delete_collection<C>(
        &self,
        collection_path: &str,
        confirm: C,
        options: DeleteOptions,
    ) -> Result<DeleteResult, DeleteError>
    where
        C: FnOnce(&str) -> bool + Send,
    {
        if options.page_size == 0 {
            return Err(DeleteError::InvalidPageSize);
        }
        crate::storage::traits::check_collection_path(collection_path)?;

        if !confirm(collection_path) {
            tracing::info!("Deletion declined");
            return Ok(DeleteResult::default());
        }

        let deleted_count =
            delete_pages(self.store.as_ref(), collection_path, options.page_size).await?;
        tracing::info!(deleted_count, "Collection deleted");
        Ok(DeleteResult {
            deleted_count,
            confirmed: true,
        })
    }

    /// Deletes one document, and its subcollections when `recursive`.
    ///
    /// Deleting a missing document is not an error; the count is then zero.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::Store`] for an invalid path or a failed read or
    /// commit.
    #[instrument(name = "firebulk.delete_document", skip(self, options))]
    pub async fn delete_document(
        &self,
        document_path: &str,
        recursive: bool,
        options: DeleteOptions,
    ) -> Result<DeleteResult, DeleteError> {
        if options.page_size == 0 {
            return Err(DeleteError::InvalidPageSize);
        }
        let store = self.store.as_ref();
        let doc = store.resolve_document_ref(document_path)?;

        let mut deleted_count = 0;
        if recursive {
            deleted_count += delete_subcollections(store, &doc, options.page_size).await?;
        }
        let existed = store.get_document(doc.path()).await?.is_some();
        let mut batch = store.batch();
        batch.delete(&doc);
        batch.commit().await?;
        if existed {
            deleted_count += 1;
            metrics::counter!("firebulk_documents_deleted_total").increment(1);
        }

        Ok(DeleteResult {
            deleted_count,
            confirmed: true,
        })
    }
}

fn delete_pages<'a>(
    store: &'a dyn DocumentStore,
    collection_path: &'a str,
    page_size: usize,
) -> BoxFuture<'a, Result<usize, StoreError>> {
    Box::pin(async move {
        let mut deleted = 0;
        loop {
            let page = store.get_documents_page(collection_path, page_size).await?;
            if page.is_empty() {
                break;
            }

            for doc in &page {
                deleted += delete_subcollections(store, doc, page_size).await?;
            }

            let mut batch = store.batch();
            for doc in &page {
                batch.delete(doc);
            }
            batch.commit().await?;
            deleted += page.len();
            metrics::counter!("firebulk_documents_deleted_total").increment(page.len() as u64);
            tracing::debug!(collection = collection_path, page = page.len(), "Deleted page");

            if page.len() < page_size {
                break;
            }
        }
        Ok(deleted)
    })
}

fn delete_subcollections<'a>(
    store: &'a dyn DocumentStore,
    doc: &'a DocumentRef,
    page_size: usize,
) -> BoxFuture<'a, Result<usize, StoreError>> {
    Box::pin(async move {
        let mut deleted = 0;
        for name in store.list_subcollection_names(doc.path()).await? {
            let collection = path::join(doc.path(), &name);
            deleted += delete_pages(store, &collection, page_size).await?;
        }
        Ok(deleted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for path in [
            "users/alice",
            "users/bob",
            "users/alice/orders/o1",
            "users/alice/orders/o2",
            "users/alice/orders/o1/items/i1",
            "teams/t1",
        ] {
            store.insert(path, json!({"p": path})).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_declined_confirmation_touches_nothing() {
        let store = seeded();
        let service = DeleteService::new(store.clone());
        let asked = AtomicUsize::new(0);

        let result = service
            .delete_collection(
                "users",
                |path| {
                    asked.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(path, "users");
                    false
                },
                DeleteOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result, DeleteResult::default());
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.len(), 6);
    }

    #[tokio::test]
    async fn test_deletes_nested_tree() {
        let store = seeded();
        let service = DeleteService::new(store.clone());

        let result = service
            .delete_collection("users", |_| true, DeleteOptions::default())
            .await
            .unwrap();

        assert!(result.confirmed);
        assert_eq!(result.deleted_count, 5);
        assert_eq!(store.len(), 1);
        assert!(store.get_document("teams/t1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_small_pages() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..7 {
            store.insert(&format!("logs/l{i}"), json!({})).unwrap();
        }
        let service = DeleteService::new(store.clone());

        let result = service
            .delete_collection("logs", |_| true, DeleteOptions::default().with_page_size(3))
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 7);
        assert!(store.is_empty());
        // 3 + 3 + 1
        assert_eq!(store.commit_count(), 3);
    }

    #[tokio::test]
    async fn test_exact_page_multiple_reads_one_empty_page() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..4 {
            store.insert(&format!("logs/l{i}"), json!({})).unwrap();
        }
        let service = DeleteService::new(store.clone());
        let result = service
            .delete_collection("logs", |_| true, DeleteOptions::default().with_page_size(2))
            .await
            .unwrap();
        assert_eq!(result.deleted_count, 4);
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_commit_failure_stops_walk() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..6 {
            store.insert(&format!("logs/l{i}"), json!({})).unwrap();
        }
        store.fail_commit_at(2);
        let service = DeleteService::new(store.clone());

        let err = service
            .delete_collection("logs", |_| true, DeleteOptions::default().with_page_size(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeleteError::Store(StoreError::CommitRejected { .. })
        ));
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_rejects_document_path_and_zero_page() {
        let service = DeleteService::new(seeded());
        let err = service
            .delete_collection("users/alice", |_| true, DeleteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::Store(StoreError::InvalidPath { .. })));

        let err = service
            .delete_collection("users", |_| true, DeleteOptions::default().with_page_size(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::InvalidPageSize));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let store = seeded();
        let service = DeleteService::new(store.clone());

        let shallow = service
            .delete_document("users/bob", false, DeleteOptions::default())
            .await
            .unwrap();
        assert_eq!(shallow.deleted_count, 1);

        let deep = service
            .delete_document("users/alice", true, DeleteOptions::default())
            .await
            .unwrap();
        assert_eq!(deep.deleted_count, 4);
        assert_eq!(store.len(), 1);

        let missing = service
            .delete_document("users/nobody", false, DeleteOptions::default())
            .await
            .unwrap();
        assert_eq!(missing.deleted_count, 0);
    }
}
