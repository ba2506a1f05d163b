//! MCP tool implementations.
//!
//! Each tool is a thin wrapper over one service call. Service failures are
//! reported through [`ToolResult::is_error`], never as protocol errors.

use crate::config::BatchLimits;
use crate::io::{ExportOptions, ExportService, ImportOptions, ImportService};
use crate::models::path::is_document_path;
use crate::services::{DeleteOptions, DeleteService, DocumentService};
use crate::storage::{DocumentStore, StoreError};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Registry of MCP tools.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
    export: ExportService,
    import: ImportService,
    delete: DeleteService,
    documents: DocumentService,
    limits: BatchLimits,
}

impl ToolRegistry {
    /// Creates a registry whose tools operate on `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, limits: BatchLimits) -> Self {
        let tools = definitions()
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();

        Self {
            tools,
            export: ExportService::new(Arc::clone(&store)),
            import: ImportService::new(Arc::clone(&store)),
            delete: DeleteService::new(Arc::clone(&store)),
            documents: DocumentService::new(store),
            limits,
        }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown tool, malformed arguments, or a
    /// failed service call.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        match name {
            "firebulk_export" => self.execute_export(arguments).await,
            "firebulk_import" => self.execute_import(arguments).await,
            "firebulk_delete" => self.execute_delete(arguments).await,
            "firebulk_get" => self.execute_get(arguments).await,
            "firebulk_set" => self.execute_set(arguments).await,
            "firebulk_list" => self.execute_list(arguments).await,
            _ => Err(Error::InvalidInput(format!("Unknown tool: {name}"))),
        }
    }

    async fn execute_export(&self, arguments: Value) -> Result<ToolResult> {
        let args: ExportArgs = parse_args(arguments)?;
        let mut options = ExportOptions::new(args.collection_path)
            .with_subcollections(args.include_subcollections.unwrap_or(true));

        if let Some(output) = args.output {
            options = options.with_output(output);
            let result = self.export.export_collection(&options, None).await?;
            return ToolResult::json(&result);
        }

        let manifest = self.export.export_to_manifest(&options, None).await?;
        let total_documents: usize = manifest
            .documents
            .iter()
            .map(crate::models::DocumentRecord::tree_size)
            .sum();
        ToolResult::json(&serde_json::json!({
            "exportedCount": manifest.documents.len(),
            "totalDocuments": total_documents,
            "manifest": manifest,
        }))
    }

    async fn execute_import(&self, arguments: Value) -> Result<ToolResult> {
        let args: ImportArgs = parse_args(arguments)?;
        let options = ImportOptions::new(args.input_path)
            .with_limits(self.limits)
            .with_batch_size(args.batch_size.unwrap_or(self.limits.default_batch_size))
            .with_subcollections(args.include_subcollections.unwrap_or(true))
            .with_resolve_sentinels(args.resolve_sentinels.unwrap_or(false));
        let result = self.import.import_data(&options, None).await?;
        ToolResult::json(&result)
    }

    async fn execute_delete(&self, arguments: Value) -> Result<ToolResult> {
        let args: DeleteArgs = parse_args(arguments)?;
        let options = DeleteOptions::from_limits(&self.limits);

        let result = if is_document_path(&args.path) {
            if args.confirm {
                self.delete
                    .delete_document(&args.path, args.recursive.unwrap_or(true), options)
                    .await?
            } else {
                crate::services::DeleteResult::default()
            }
        } else {
            let confirm = args.confirm;
            self.delete
                .delete_collection(&args.path, move |_| confirm, options)
                .await?
        };
        ToolResult::json(&result)
    }

    async fn execute_get(&self, arguments: Value) -> Result<ToolResult> {
        let args: PathArgs = parse_args(arguments)?;
        match self.documents.get(&args.path).await? {
            Some(snapshot) => ToolResult::json(&serde_json::json!({
                "id": snapshot.id,
                "path": snapshot.path,
                "data": snapshot.data,
            })),
            None => Err(StoreError::NotFound { path: args.path }.into()),
        }
    }

    async fn execute_set(&self, arguments: Value) -> Result<ToolResult> {
        let args: SetArgs = parse_args(arguments)?;
        self.documents.set(&args.path, &args.data).await?;
        Ok(ToolResult::text(format!("Document written: {}", args.path)))
    }

    async fn execute_list(&self, arguments: Value) -> Result<ToolResult> {
        let args: ListArgs = parse_args(arguments)?;
        let collections = self.documents.list(args.path.as_deref()).await?;
        ToolResult::json(&serde_json::json!({ "collections": collections }))
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful plain-text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed result carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    fn json<T: Serialize>(value: &T) -> Result<Self> {
        let text = serde_json::to_string_pretty(value).map_err(|e| Error::OperationFailed {
            operation: "encode_tool_result".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::text(text))
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

#[derive(Debug, Deserialize)]
struct ExportArgs {
    collection_path: String,
    output: Option<PathBuf>,
    include_subcollections: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ImportArgs {
    input_path: PathBuf,
    batch_size: Option<usize>,
    include_subcollections: Option<bool>,
    resolve_sentinels: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    path: String,
    #[serde(default)]
    confirm: bool,
    recursive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SetArgs {
    path: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    path: Option<String>,
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "firebulk_export",
            "Export a collection (and its subcollections) as a JSON manifest. \
             Returns the manifest inline when no output file is given.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "collection_path": {
                        "type": "string",
                        "description": "Collection to export, e.g. users or users/alice/orders"
                    },
                    "output": {
                        "type": "string",
                        "description": "Optional: file to write the manifest to"
                    },
                    "include_subcollections": {
                        "type": "boolean",
                        "description": "Descend into subcollections (default: true)"
                    }
                },
                "required": ["collection_path"]
            }),
        ),
        tool(
            "firebulk_import",
            "Import a JSON manifest in atomic batches. Earlier batches stay applied if a later one fails.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "input_path": {
                        "type": "string",
                        "description": "Manifest file to import"
                    },
                    "batch_size": {
                        "type": "integer",
                        "description": "Documents per batch (default: 500)",
                        "minimum": 1,
                        "maximum": 500
                    },
                    "include_subcollections": {
                        "type": "boolean",
                        "description": "Import nested subcollection records (default: true)"
                    },
                    "resolve_sentinels": {
                        "type": "boolean",
                        "description": "Convert sentinel markers into field transforms (default: false)"
                    }
                },
                "required": ["input_path"]
            }),
        ),
        tool(
            "firebulk_delete",
            "Recursively delete a collection or document. Nothing is deleted unless confirm is true.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Collection or document path"
                    },
                    "confirm": {
                        "type": "boolean",
                        "description": "Must be true to delete anything"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "For document paths: also delete subcollections (default: true)"
                    }
                },
                "required": ["path", "confirm"]
            }),
        ),
        tool(
            "firebulk_get",
            "Read a single document.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Document path" }
                },
                "required": ["path"]
            }),
        ),
        tool(
            "firebulk_set",
            "Replace a document. Sentinel markers in data are resolved.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Document path" },
                    "data": { "type": "object", "description": "Document fields" }
                },
                "required": ["path", "data"]
            }),
        ),
        tool(
            "firebulk_list",
            "List root collections, or the subcollections of a document.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Optional: document path" }
                },
                "required": []
            }),
        ),
    ]
}
