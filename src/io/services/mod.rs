//! Import and export service implementations.

pub mod export;
pub mod import;

pub use export::{ExportError, ExportOptions, ExportResult, ExportService};
pub use import::{DocumentFailure, ImportError, ImportOptions, ImportResult, ImportService};
