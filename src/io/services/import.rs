//! Bulk document import.
//!
//! Reads an export manifest and writes its documents to the store in
//! chunks. Each chunk is one atomic batch; nothing spans two chunks, so a
//! commit failure part-way leaves earlier chunks applied.

use crate::config::BatchLimits;
use crate::io::ProgressSink;
use crate::io::validation;
use crate::models::value::{find_transform_in_array, map_from_json};
use crate::models::{DocumentRecord, FieldMap, ImportManifest};
use crate::services::sentinel::SentinelResolver;
use crate::storage::{DocumentRef, DocumentStore, StoreError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// Import failures.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Batch size outside the store's limits. Raised before any I/O.
    #[error("invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize {
        /// Requested size.
        size: usize,
        /// Lower bound.
        min: usize,
        /// Upper bound.
        max: usize,
    },

    /// The input file does not exist.
    #[error("input file not found: {}", path.display())]
    FileNotFound {
        /// Input path.
        path: PathBuf,
    },

    /// The input file exists but could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    ReadError {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or has the wrong shape.
    #[error("invalid manifest{}: {message}", index.map(|i| format!(" (document {i})")).unwrap_or_default())]
    StructureError {
        /// Index of the offending top-level record, if any.
        index: Option<usize>,
        /// What is wrong.
        message: String,
    },

    /// A chunk commit failed. Earlier chunks stay applied.
    #[error(
        "batch {chunk_index} failed after {committed_count} documents were imported \
         (partial success: {partial_success}): {source}"
    )]
    BatchCommitError {
        /// Whether any earlier chunk was applied.
        partial_success: bool,
        /// Documents applied before the failure.
        committed_count: usize,
        /// Zero-based index of the failed chunk.
        chunk_index: usize,
        /// Documents excluded from batches before the failure.
        failed_count: usize,
        /// Details for each excluded document, including the failed chunk.
        failures: Vec<DocumentFailure>,
        /// Store error from the commit.
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    /// Builds a [`ImportError::StructureError`].
    pub fn structure(index: Option<usize>, message: impl Into<String>) -> Self {
        Self::StructureError {
            index,
            message: message.into(),
        }
    }
}

/// Options for an import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Manifest file to read.
    pub input_source: PathBuf,
    /// Documents per atomic batch.
    pub batch_size: usize,
    /// Limits the batch size is checked against.
    pub limits: BatchLimits,
    /// Also write nested subcollection records.
    pub include_subcollections: bool,
    /// Convert sentinel markers in `data` into field transforms.
    pub resolve_sentinels: bool,
}

impl ImportOptions {
    /// Creates options with default limits and batch size.
    #[must_use]
    pub fn new(input_source: impl Into<PathBuf>) -> Self {
        let limits = BatchLimits::default();
        Self {
            input_source: input_source.into(),
            batch_size: limits.default_batch_size,
            limits,
            include_subcollections: true,
            resolve_sentinels: false,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the limits; the batch size is unchanged.
    #[must_use]
    pub const fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enables or disables nested record import.
    #[must_use]
    pub const fn with_subcollections(mut self, include: bool) -> Self {
        self.include_subcollections = include;
        self
    }

    /// Enables or disables sentinel resolution.
    #[must_use]
    pub const fn with_resolve_sentinels(mut self, resolve: bool) -> Self {
        self.resolve_sentinels = resolve;
        self
    }
}

/// A document left out of its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFailure {
    /// Position in the flattened document sequence.
    pub index: usize,
    /// Record ID.
    pub id: String,
    /// Record path.
    pub path: String,
    /// Why it was excluded.
    pub reason: String,
}

/// Result of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Documents written.
    pub imported_count: usize,
    /// Always zero; reserved.
    pub skipped_count: usize,
    /// Documents excluded from their batch.
    pub failed_count: usize,
    /// Details for each excluded document.
    pub failures: Vec<DocumentFailure>,
}

/// Service for importing manifests into a store.
pub struct ImportService {
    store: Arc<dyn DocumentStore>,
    resolver: SentinelResolver,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            resolver: SentinelResolver::new(),
        }
    }

    /// Imports the manifest file named by `options.input_source`.
    ///
    /// The batch size is checked before the file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidBatchSize`], [`ImportError::FileNotFound`],
    /// [`ImportError::ReadError`], [`ImportError::StructureError`], or
    /// [`ImportError::BatchCommitError`].
    #[instrument(
        name = "firebulk.import",
        skip(self, options, progress),
        fields(input = %options.input_source.display(), batch_size = options.batch_size)
    )]
    pub async fn import_data(
        &self,
        options: &ImportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ImportResult, ImportError> {
        check_batch_size(options)?;
        let manifest = read_manifest(&options.input_source).await?;
        self.import_manifest(&manifest, options, progress).await
    }

    /// Imports an in-memory manifest; `options.input_source` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidBatchSize`] or
    /// [`ImportError::BatchCommitError`].
    pub async fn import_manifest(
        &self,
        manifest: &ImportManifest,
        options: &ImportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ImportResult, ImportError> {
        check_batch_size(options)?;

        let documents: Vec<&DocumentRecord> = if options.include_subcollections {
            manifest.flatten()
        } else {
            manifest.documents.iter().collect()
        };
        let total = documents.len();
        let mut result = ImportResult::default();

        for (chunk_index, chunk) in documents.chunks(options.batch_size).enumerate() {
            let start = chunk_index * options.batch_size;
            let mut batch = self.store.batch();
            let mut staged = 0usize;

            for (offset, record) in chunk.iter().enumerate() {
                match self.prepare(record, options.resolve_sentinels) {
                    Ok((doc, data)) => {
                        batch.set(&doc, data);
                        staged += 1;
                    },
                    Err(reason) => {
                        tracing::warn!(path = %record.path, %reason, "Excluding document from batch");
                        metrics::counter!("firebulk_import_document_failures_total").increment(1);
                        result.failures.push(DocumentFailure {
                            index: start + offset,
                            id: record.id.clone(),
                            path: record.path.clone(),
                            reason,
                        });
                    },
                }
            }

            if let Err(source) = batch.commit().await {
                tracing::error!(chunk_index, error = %source, "Import batch commit failed");
                return Err(ImportError::BatchCommitError {
                    partial_success: result.imported_count > 0,
                    committed_count: result.imported_count,
                    chunk_index,
                    failed_count: result.failures.len(),
                    failures: std::mem::take(&mut result.failures),
                    source,
                });
            }

            result.imported_count += staged;
            metrics::counter!("firebulk_documents_imported_total").increment(staged as u64);
            if let Some(sink) = progress {
                sink.on_progress(start + chunk.len(), total);
            }
        }

        result.failed_count = result.failures.len();
        tracing::info!(
            imported = result.imported_count,
            failed = result.failed_count,
            "Import complete"
        );
        Ok(result)
    }

    /// Resolves a record's reference and field values.
    fn prepare(
        &self,
        record: &DocumentRecord,
        resolve_sentinels: bool,
    ) -> Result<(DocumentRef, FieldMap), String> {
        let doc = self
            .store
            .resolve_document_ref(&record.path)
            .map_err(|e| e.to_string())?;
        let data = if resolve_sentinels {
            self.resolver
                .resolve_document(&record.data)
                .map_err(|e| e.to_string())?
        } else {
            map_from_json(record.data.clone())
        };
        if let Some(field) = find_transform_in_array(&data) {
            return Err(format!("field transform inside an array at '{field}'"));
        }
        Ok((doc, data))
    }
}

const fn check_batch_size(options: &ImportOptions) -> Result<(), ImportError> {
    if options.limits.accepts(options.batch_size) {
        Ok(())
    } else {
        Err(ImportError::InvalidBatchSize {
            size: options.batch_size,
            min: options.limits.min_batch_size,
            max: options.limits.max_batch_size,
        })
    }
}

async fn read_manifest(path: &std::path::Path) -> Result<ImportManifest, ImportError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
        },
        Err(source) => {
            return Err(ImportError::ReadError {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    validation::parse_manifest(&text)
}
