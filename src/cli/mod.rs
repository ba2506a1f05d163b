//! CLI command implementations.
//!
//! Each submodule implements one command of the `firebulk` binary.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `export` | Export a collection tree to a JSON manifest |
//! | `import` | Import a manifest in atomic batches |
//! | `delete` | Recursively delete a collection or document |
//! | `get` | Print one document |
//! | `set` | Replace one document (sentinels resolved) |
//! | `list` | List root collections or a document's subcollections |
//! | `serve` | Run as MCP server on stdio |
//!
//! # Example Usage
//!
//! ```bash
//! firebulk export users --output users.json
//! firebulk import users.json --batch-size 200
//! firebulk delete users --recursive --yes
//! firebulk set counters/home '{"hits": {"kind": "increment", "operand": 1}}'
//! ```

// Allow print_stdout/stderr in CLI module (consistent with main.rs)
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod delete;
pub mod document;
pub mod export;
pub mod import;
pub mod serve;

use crate::config::FirebulkConfig;
use crate::io::ProgressSink;
use crate::storage::{DocumentStore, FilesystemStore};
use crate::{Error, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Shared state for a CLI invocation.
pub struct CliContext {
    /// Resolved configuration.
    pub config: FirebulkConfig,
    /// Store the command operates on.
    pub store: Arc<dyn DocumentStore>,
}

impl CliContext {
    /// Opens the filesystem store under `config.data_dir`, creating it if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(config: FirebulkConfig) -> Result<Self> {
        let store = FilesystemStore::with_create(&config.data_dir)?;
        tracing::debug!(data_dir = %config.data_dir.display(), "Opened document store");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Uses an existing store.
    #[must_use]
    pub fn with_store(config: FirebulkConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }
}

/// Progress line rewritten in place on stdout: `\rExporting: 3/10`.
pub struct ConsoleProgress {
    label: &'static str,
}

impl ConsoleProgress {
    /// Creates a progress printer with the given label.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }

    /// Formats one progress line.
    #[must_use]
    pub fn line(&self, current: usize, total: usize) -> String {
        format!("\r{}: {current}/{total}", self.label)
    }

    /// Ends the progress line.
    pub fn finish(&self) {
        println!();
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, current: usize, total: usize) {
        print!("{}", self.line(current, total));
        let _ = io::stdout().flush();
    }
}

/// Asks `Proceed? [y/N]` on stdin.
///
/// # Errors
///
/// Returns an error if stdout cannot be flushed or stdin cannot be read.
pub fn prompt_confirmation() -> Result<bool> {
    print!("\nProceed? [y/N] ");
    io::stdout().flush().map_err(|e| Error::OperationFailed {
        operation: "flush_stdout".to_string(),
        cause: e.to_string(),
    })?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| Error::OperationFailed {
            operation: "read_stdin".to_string(),
            cause: e.to_string(),
        })?;
    Ok(is_affirmative(&input))
}

/// Returns `true` for `y` or `yes`, any case.
#[must_use]
pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("y\n", true; "y")]
    #[test_case("YES", true; "yes uppercase")]
    #[test_case(" yes \n", true; "padded")]
    #[test_case("n", false; "n")]
    #[test_case("", false; "empty")]
    #[test_case("yep", false; "other")]
    fn test_is_affirmative(input: &str, expected: bool) {
        assert_eq!(is_affirmative(input), expected);
    }

    #[test]
    fn test_progress_line() {
        let progress = ConsoleProgress::new("Exporting");
        assert_eq!(progress.line(3, 10), "\rExporting: 3/10");
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join("store");
        let context = CliContext::open(FirebulkConfig::default().with_data_dir(&data_dir)).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(context.config.data_dir, data_dir);
    }
}
