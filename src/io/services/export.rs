//! Bulk collection export.
//!
//! Reads a collection (and optionally every nested subcollection) into an
//! [`ImportManifest`] and writes it as pretty-printed JSON.

use crate::io::ProgressSink;
use crate::models::path;
use crate::models::{DocumentRecord, ImportManifest};
use crate::storage::{DocumentStore, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::instrument;

type Subcollections = BTreeMap<String, Vec<DocumentRecord>>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Export failures.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The output file could not be written.
    #[error("failed to write export to '{}': {source}", path.display())]
    WriteError {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be encoded.
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Options for an export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Collection to export.
    pub collection_path: String,
    /// Output file. `None` (or an empty path) skips writing.
    pub output_destination: Option<PathBuf>,
    /// Descend into subcollections.
    pub include_subcollections: bool,
}

impl ExportOptions {
    /// Creates options for a collection, with subcollections and no output
    /// file.
    #[must_use]
    pub fn new(collection_path: impl Into<String>) -> Self {
        Self {
            collection_path: collection_path.into(),
            output_destination: None,
            include_subcollections: true,
        }
    }

    /// Sets the output file.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_destination = Some(path.into());
        self
    }

    /// Enables or disables the subcollection walk.
    #[must_use]
    pub const fn with_subcollections(mut self, include: bool) -> Self {
        self.include_subcollections = include;
        self
    }

    fn destination(&self) -> Option<&Path> {
        self.output_destination
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    /// Top-level documents exported.
    pub exported_count: usize,
    /// Documents exported at every level.
    pub total_documents: usize,
    /// File written, if any.
    pub destination: Option<PathBuf>,
}

/// Service for exporting collections.
pub struct ExportService {
    store: Arc<dyn DocumentStore>,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Exports a collection and writes the manifest if a destination is set.
    ///
    /// Progress fires once per top-level document as `(done, total)`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Store`] for read failures and
    /// [`ExportError::WriteError`] if the file cannot be written.
    #[instrument(
        name = "firebulk.export",
        skip(self, options, progress),
        fields(collection = %options.collection_path)
    )]
    pub async fn export_collection(
        &self,
        options: &ExportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ExportResult, ExportError> {
        let manifest = self.export_to_manifest(options, progress).await?;
        let total_documents = manifest
            .documents
            .iter()
            .map(DocumentRecord::tree_size)
            .sum();

        let destination = match options.destination() {
            Some(path) => {
                write_manifest(path, &manifest).await?;
                Some(path.to_path_buf())
            },
            None => None,
        };

        metrics::counter!("firebulk_documents_exported_total").increment(total_documents as u64);
        tracing::info!(
            exported = manifest.documents.len(),
            total_documents,
            "Export complete"
        );
        Ok(ExportResult {
            exported_count: manifest.documents.len(),
            total_documents,
            destination,
        })
    }

    /// Exports a collection into memory without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Store`] for read failures.
    pub async fn export_to_manifest(
        &self,
        options: &ExportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ImportManifest, ExportError> {
        let store: &dyn DocumentStore = self.store.as_ref();
        let snapshots = store.get_all_documents(&options.collection_path).await?;
        let total = snapshots.len();
        let mut documents = Vec::with_capacity(total);

        for (i, snapshot) in snapshots.into_iter().enumerate() {
            let mut record = DocumentRecord::new(snapshot.id, snapshot.path, snapshot.data);
            if options.include_subcollections {
                record.subcollections = export_subcollections(store, &record.path).await?;
            }
            documents.push(record);
            if let Some(sink) = progress {
                sink.on_progress(i + 1, total);
            }
        }

        Ok(ImportManifest::new(documents))
    }
}

/// Exports every subcollection under a document; `None` when it has none.
fn export_subcollections<'a>(
    store: &'a dyn DocumentStore,
    document_path: &'a str,
) -> BoxFuture<'a, Result<Option<Subcollections>, StoreError>> {
    Box::pin(async move {
        let names = store.list_subcollection_names(document_path).await?;
        if names.is_empty() {
            return Ok(None);
        }

        let mut subcollections = Subcollections::new();
        for name in names {
            let collection = path::join(document_path, &name);
            let snapshots = store.get_all_documents(&collection).await?;
            let mut records = Vec::with_capacity(snapshots.len());
            for snapshot in snapshots {
                let mut record = DocumentRecord::new(snapshot.id, snapshot.path, snapshot.data);
                record.subcollections = export_subcollections(store, &record.path).await?;
                records.push(record);
            }
            subcollections.insert(name, records);
        }
        Ok(Some(subcollections))
    })
}

/// Writes to a sibling temp file and renames it over the destination.
async fn write_manifest(path: &Path, manifest: &ImportManifest) -> Result<(), ExportError> {
    let write_error = |source| ExportError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(manifest)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()));
    if let Err(source) = tokio::fs::write(&temp, &json).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(write_error(source));
    }
    if let Err(source) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(write_error(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RecordingProgress;
    use crate::storage::MemoryStore;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert("users/alice", json!({"name": "Alice"})).unwrap();
        store.insert("users/bob", json!({"name": "Bob"})).unwrap();
        store
            .insert("users/alice/orders/o1", json!({"total": 12}))
            .unwrap();
        store
            .insert("users/alice/orders/o1/items/i1", json!({"sku": "x"}))
            .unwrap();
        store.insert("teams/t1", json!({})).unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_empty_collection() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nothing.json");
        let service = ExportService::new(Arc::new(MemoryStore::new()));
        let progress = RecordingProgress::new();
        let result = service
            .export_collection(
                &ExportOptions::new("nothing").with_output(&output),
                Some(&progress),
            )
            .await
            .unwrap();
        assert_eq!(result.exported_count, 0);
        assert_eq!(result.total_documents, 0);
        assert_eq!(result.destination.as_deref(), Some(output.as_path()));
        assert!(progress.events().is_empty());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, json!({"documents": []}));
    }

    #[tokio::test]
    async fn test_export_progress_per_top_level_document() {
        let service = ExportService::new(seeded());
        let progress = RecordingProgress::new();
        let result = service
            .export_collection(&ExportOptions::new("users"), Some(&progress))
            .await
            .unwrap();
        assert_eq!(result.exported_count, 2);
        assert_eq!(result.total_documents, 4);
        assert_eq!(progress.events(), vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn test_export_nested_tree() {
        let service = ExportService::new(seeded());
        let manifest = service
            .export_to_manifest(&ExportOptions::new("users"), None)
            .await
            .unwrap();
        let alice = manifest
            .documents
            .iter()
            .find(|d| d.id == "alice")
            .unwrap();
        let orders = &alice.subcollections.as_ref().unwrap()["orders"];
        assert_eq!(orders[0].path, "users/alice/orders/o1");
        let items = &orders[0].subcollections.as_ref().unwrap()["items"];
        assert_eq!(items[0].data["sku"], json!("x"));

        let bob = manifest.documents.iter().find(|d| d.id == "bob").unwrap();
        assert!(bob.subcollections.is_none());
    }

    #[tokio::test]
    async fn test_export_without_subcollections() {
        let service = ExportService::new(seeded());
        let result = service
            .export_collection(
                &ExportOptions::new("users").with_subcollections(false),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.total_documents, 2);
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("users.json");
        let service = ExportService::new(seeded());

        let result = service
            .export_collection(&ExportOptions::new("users").with_output(&output), None)
            .await
            .unwrap();
        assert_eq!(result.destination.as_deref(), Some(output.as_path()));

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains('\n'));
        let manifest: ImportManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.documents.len(), 2);

        let leftovers: Vec<_> = std::fs::read_dir(output.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_empty_destination_skips_write() {
        let service = ExportService::new(seeded());
        let result = service
            .export_collection(&ExportOptions::new("users").with_output(""), None)
            .await
            .unwrap();
        assert!(result.destination.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let service = ExportService::new(seeded());

        let err = service
            .export_collection(
                &ExportOptions::new("users").with_output(blocker.join("out.json")),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::WriteError { .. }));
    }

    #[tokio::test]
    async fn test_document_path_rejected() {
        let service = ExportService::new(seeded());
        let err = service
            .export_collection(&ExportOptions::new("users/alice"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Store(StoreError::InvalidPath { .. })));
    }
}
