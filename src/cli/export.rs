//! Export CLI command.

#![allow(clippy::print_stdout)]

use super::{CliContext, ConsoleProgress};
use crate::Result;
use crate::io::{ExportOptions, ExportService};
use std::path::PathBuf;

/// Arguments of `firebulk export`.
#[derive(Debug, Clone)]
pub struct ExportArgs {
    /// Collection to export.
    pub collection_path: String,
    /// Output file.
    pub output: PathBuf,
    /// Descend into subcollections.
    pub include_subcollections: bool,
}

/// Executes the export command.
///
/// # Errors
///
/// Returns an error if the collection cannot be read or the file written.
pub async fn execute(context: &CliContext, args: ExportArgs) -> Result<()> {
    let service = ExportService::new(context.store.clone());
    let options = ExportOptions::new(args.collection_path)
        .with_output(args.output)
        .with_subcollections(args.include_subcollections);

    let progress = ConsoleProgress::new("Exporting");
    let result = service.export_collection(&options, Some(&progress)).await;
    progress.finish();
    let result = result?;

    println!(
        "Exported {} documents ({} including subcollections)",
        result.exported_count, result.total_documents
    );
    if let Some(destination) = &result.destination {
        println!("Written to {}", destination.display());
    }
    Ok(())
}
