//! Bulk import/export subsystem.
//!
//! # Manifest format
//!
//! Exports and imports share one JSON shape:
//!
//! ```json
//! {
//!   "documents": [
//!     {
//!       "id": "alice",
//!       "path": "users/alice",
//!       "data": { "name": "Alice" },
//!       "subcollections": {
//!         "orders": [ { "id": "o1", "path": "users/alice/orders/o1", "data": {} } ]
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use firebulk::io::{ExportOptions, ExportService};
//!
//! let service = ExportService::new(store);
//! let result = service
//!     .export_collection(&ExportOptions::new("users").with_output("users.json"), None)
//!     .await?;
//! println!("Exported {} documents", result.total_documents);
//! ```

pub mod progress;
pub mod services;
pub mod validation;

pub use progress::{ProgressSink, RecordingProgress};
pub use services::export::{ExportError, ExportOptions, ExportResult, ExportService};
pub use services::import::{
    DocumentFailure, ImportError, ImportOptions, ImportResult, ImportService,
};
