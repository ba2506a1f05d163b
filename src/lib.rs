//! # Firebulk
//!
//! Bulk export, import and recursive deletion for hierarchical document
//! stores.
//!
//! Firebulk moves whole collection trees in and out of a document store
//! that addresses documents by slash paths (`users/alice/orders/o1`) and
//! writes through size-limited atomic batches.
//!
//! ## Features
//!
//! - Recursive export of a collection and all nested subcollections to JSON
//! - Chunked import with per-chunk atomicity and partial-success reporting
//! - Paged recursive delete behind a confirmation gate
//! - Sentinel markers (`serverTimestamp`, `increment`, `arrayUnion`,
//!   `arrayRemove`, `delete`) resolved into commit-time field transforms
//! - MCP server exposing the same operations as tools
//!
//! ## Example
//!
//! ```rust,ignore
//! use firebulk::io::{ImportOptions, ImportService};
//! use firebulk::storage::FilesystemStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FilesystemStore::with_create(".firebulk")?);
//! let service = ImportService::new(store);
//! let result = service
//!     .import_data(&ImportOptions::new("users.json").with_batch_size(200), None)
//!     .await?;
//! println!("Imported {} documents", result.imported_count);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod io;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{BatchLimits, FirebulkConfig};
pub use io::{
    ExportError, ExportOptions, ExportResult, ExportService, ImportError, ImportOptions,
    ImportResult, ImportService, ProgressSink,
};
pub use models::{DocumentRecord, FieldTransform, FieldValue, ImportManifest};
pub use services::{
    DeleteError, DeleteOptions, DeleteResult, DeleteService, DocumentService, ResolveError,
    SentinelResolver,
};
pub use storage::{DocumentStore, FilesystemStore, MemoryStore, StoreError};

/// Error type for firebulk operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Bad arguments, malformed JSON, inconsistent config |
/// | `OperationFailed` | Config/log file I/O, terminal prompts, protocol I/O |
/// | `Resolve` | Malformed sentinel marker |
/// | `Export` / `Import` / `Delete` | The corresponding bulk operation failed |
/// | `Store` | A single-document read or write failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Sentinel resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Export failed.
    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    /// Import failed.
    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    /// Delete failed.
    #[error("delete failed: {0}")]
    Delete(#[from] DeleteError),

    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for firebulk operations.
pub type Result<T> = std::result::Result<T, Error>;
