//! Binary entry point for firebulk.
//!
//! Bulk export, import and delete of hierarchical document collections.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use firebulk::cli::{self, CliContext};
use firebulk::config::FirebulkConfig;
use firebulk::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// firebulk - bulk tooling for hierarchical document stores.
#[derive(Parser)]
#[command(name = "firebulk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Export a collection to a JSON manifest.
    Export {
        /// Collection path, e.g. `users` or `users/alice/orders`.
        collection_path: String,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,

        /// Descend into subcollections.
        #[arg(long)]
        include_subcollections: bool,
    },

    /// Import a JSON manifest.
    Import {
        /// Manifest file.
        input: PathBuf,

        /// Documents per batch.
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Skip nested subcollection records.
        #[arg(long)]
        no_subcollections: bool,

        /// Resolve sentinel markers (increment, serverTimestamp, ...).
        #[arg(long)]
        resolve_sentinels: bool,
    },

    /// Delete a collection or document.
    Delete {
        /// Collection or document path.
        path: String,

        /// Delete subcollections too.
        #[arg(short, long)]
        recursive: bool,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Print one document.
    Get {
        /// Document path.
        path: String,
    },

    /// Replace one document with a JSON object.
    Set {
        /// Document path.
        path: String,

        /// JSON object; may contain sentinel markers.
        json: String,
    },

    /// List root collections, or the subcollections of a document.
    List {
        /// Parent document path.
        path: Option<String>,
    },

    /// Run the MCP server on stdio.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match FirebulkConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: FirebulkConfig) -> firebulk::Result<()> {
    let context = CliContext::open(config)?;

    match command {
        Commands::Export {
            collection_path,
            output,
            include_subcollections,
        } => {
            cli::export::execute(
                &context,
                cli::export::ExportArgs {
                    collection_path,
                    output,
                    include_subcollections,
                },
            )
            .await
        },

        Commands::Import {
            input,
            batch_size,
            no_subcollections,
            resolve_sentinels,
        } => {
            cli::import::execute(
                &context,
                cli::import::ImportArgs {
                    input,
                    batch_size,
                    include_subcollections: !no_subcollections,
                    resolve_sentinels,
                },
            )
            .await
        },

        Commands::Delete {
            path,
            recursive,
            yes,
        } => {
            cli::delete::execute(
                &context,
                cli::delete::DeleteArgs {
                    path,
                    recursive,
                    yes,
                },
            )
            .await
        },

        Commands::Get { path } => cli::document::get(&context, &path).await,
        Commands::Set { path, json } => cli::document::set(&context, &path, &json).await,
        Commands::List { path } => cli::document::list(&context, path.as_deref()).await,
        Commands::Serve => cli::serve::execute(&context).await,
    }
}
