//! Atomic write batches.

use super::error::StoreError;
use super::traits::{DocumentRef, DocumentStore};
use crate::models::FieldMap;

/// A single staged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    /// Replace the document with `data` (transforms evaluated at commit).
    Set {
        /// Target document.
        doc: DocumentRef,
        /// Fields to write.
        data: FieldMap,
    },
    /// Remove the document (its subcollections are untouched).
    Delete {
        /// Target document.
        doc: DocumentRef,
    },
}

impl WriteOperation {
    /// Target document of this write.
    #[must_use]
    pub const fn doc(&self) -> &DocumentRef {
        match self {
            Self::Set { doc, .. } | Self::Delete { doc } => doc,
        }
    }
}

/// Mutations staged against one store and committed together.
///
/// The store guarantees atomicity within a batch only; nothing spans two
/// batches.
pub struct WriteBatch<'a> {
    store: &'a dyn DocumentStore,
    writes: Vec<WriteOperation>,
}

impl<'a> WriteBatch<'a> {
    /// Opens an empty batch.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            writes: Vec::new(),
        }
    }

    /// Stages a full-document write.
    pub fn set(&mut self, doc: &DocumentRef, data: FieldMap) -> &mut Self {
        self.writes.push(WriteOperation::Set {
            doc: doc.clone(),
            data,
        });
        self
    }

    /// Stages a document deletion.
    pub fn delete(&mut self, doc: &DocumentRef) -> &mut Self {
        self.writes.push(WriteOperation::Delete { doc: doc.clone() });
        self
    }

    /// Number of staged writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns `true` when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commits every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns the store's error; on failure none of the writes were applied.
    pub async fn commit(self) -> Result<(), StoreError> {
        let size = self.writes.len();
        let result = self.store.commit_writes(self.writes).await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("firebulk_batch_commits_total", "status" => status).increment(1);
        tracing::debug!(writes = size, status, "Committed write batch");
        result
    }
}

impl std::fmt::Debug for WriteBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBatch")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}
