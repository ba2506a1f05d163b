//! Delete CLI command.
//!
//! # Usage
//!
//! ```bash
//! # Delete a collection tree (prompts for confirmation)
//! firebulk delete users --recursive
//!
//! # Delete one document and everything under it, without prompting
//! firebulk delete users/alice --recursive --yes
//! ```

#![allow(clippy::print_stdout)]

use super::{CliContext, prompt_confirmation};
use crate::models::path::is_document_path;
use crate::services::{DeleteOptions, DeleteService};
use crate::{Error, Result};

/// Arguments of `firebulk delete`.
#[derive(Debug, Clone)]
pub struct DeleteArgs {
    /// Collection or document path.
    pub path: String,
    /// Delete subcollections too; required for collection paths.
    pub recursive: bool,
    /// Skip the confirmation prompt.
    pub yes: bool,
}

/// Executes the delete command.
///
/// # Errors
///
/// Returns an error for a collection path without `--recursive`, a failed
/// prompt, or a failed store call.
pub async fn execute(context: &CliContext, args: DeleteArgs) -> Result<()> {
    let is_document = is_document_path(&args.path);
    if !is_document && !args.recursive {
        return Err(Error::InvalidInput(format!(
            "'{}' is a collection; pass --recursive to delete it with all subcollections",
            args.path
        )));
    }

    let scope = if args.recursive {
        "and everything below it"
    } else {
        "(subcollections are kept)"
    };
    println!("About to delete '{}' {scope}.", args.path);
    let proceed = args.yes || prompt_confirmation()?;

    let service = DeleteService::new(context.store.clone());
    let options = DeleteOptions::from_limits(&context.config.limits);
    let result = if is_document {
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
        service
            .delete_document(&args.path, args.recursive, options)
            .await?
    } else {
        service
            .delete_collection(&args.path, move |_| proceed, options)
            .await?
    };

    if result.confirmed {
        println!("Deleted {} documents", result.deleted_count);
    } else {
        println!("Aborted.");
    }
    Ok(())
}
