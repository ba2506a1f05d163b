//! Import CLI command.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use super::{CliContext, ConsoleProgress};
use crate::Result;
use crate::io::{DocumentFailure, ImportError, ImportOptions, ImportService};
use std::path::PathBuf;

/// Arguments of `firebulk import`.
#[derive(Debug, Clone)]
pub struct ImportArgs {
    /// Manifest file.
    pub input: PathBuf,
    /// Documents per batch; the configured default when `None`.
    pub batch_size: Option<usize>,
    /// Import nested subcollection records.
    pub include_subcollections: bool,
    /// Resolve sentinel markers.
    pub resolve_sentinels: bool,
}

/// Executes the import command.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or a batch commit fails.
pub async fn execute(context: &CliContext, args: ImportArgs) -> Result<()> {
    let limits = context.config.limits;
    let options = ImportOptions::new(args.input)
        .with_limits(limits)
        .with_batch_size(args.batch_size.unwrap_or(limits.default_batch_size))
        .with_subcollections(args.include_subcollections)
        .with_resolve_sentinels(args.resolve_sentinels);
    let service = ImportService::new(context.store.clone());

    let progress = ConsoleProgress::new("Importing");
    let result = service.import_data(&options, Some(&progress)).await;
    progress.finish();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            if let Some(note) = partial_failure_note(&e) {
                eprintln!("{note}");
            }
            if let ImportError::BatchCommitError { failures, .. } = &e {
                print_failures(failures);
            }
            return Err(e.into());
        },
    };

    println!("Imported {} documents", result.imported_count);
    print_failures(&result.failures);
    Ok(())
}

fn print_failures(failures: &[DocumentFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("Failed: {}", failures.len());
    for failure in failures {
        println!("  - [{}] {}: {}", failure.index, failure.path, failure.reason);
    }
}

/// Describes what a failed import left behind, for commit failures.
#[must_use]
pub fn partial_failure_note(error: &ImportError) -> Option<String> {
    match error {
        ImportError::BatchCommitError {
            partial_success: true,
            committed_count,
            ..
        } => Some(format!(
            "Note: {committed_count} documents were imported before the failure and are not rolled back."
        )),
        ImportError::BatchCommitError { .. } => {
            Some("Note: no documents were imported.".to_string())
        },
        _ => None,
    }
}
