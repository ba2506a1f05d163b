//! MCP server setup and lifecycle.
//!
//! Line-delimited JSON-RPC 2.0 over stdio. Stdout carries only protocol
//! responses; logs go to stderr or the log file.

use crate::config::BatchLimits;
use crate::mcp::ToolRegistry;
use crate::mcp::dispatch::McpMethod;
use crate::storage::DocumentStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{Instrument, info_span};

/// Maximum accepted request size in bytes.
pub const MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024;

/// MCP protocol version.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported on initialize.
const SERVER_NAME: &str = "firebulk";

type DispatchResult = std::result::Result<Value, (i32, String)>;

/// MCP server for firebulk.
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    /// Creates a server whose tools operate on `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, limits: BatchLimits) -> Self {
        Self {
            tools: ToolRegistry::new(store, limits),
        }
    }

    /// Runs the server on the process's stdin and stdout until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn run_stdio(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serves requests from `reader`, one per line, writing responses to
    /// `writer`. Returns at EOF.
    ///
    /// At most [`MAX_REQUEST_BODY_SIZE`] bytes of a line are buffered; a
    /// longer line is skipped and answered with an error.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        tracing::info!("MCP server listening on stdio");

        loop {
            let frame = read_frame(&mut reader, &mut buf)
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "read_stdin".to_string(),
                    cause: e.to_string(),
                })?;
            let response = match frame {
                Frame::Eof => break,
                Frame::Oversized(size) => {
                    metrics::counter!(
                        "mcp_requests_total",
                        "method" => "oversized",
                        "status" => "error"
                    )
                    .increment(1);
                    Some(too_large(size))
                },
                Frame::Line(line) if line.trim().is_empty() => None,
                Frame::Line(line) => self.handle_request(&line).await,
            };
            let Some(response) = response else {
                continue;
            };

            writer
                .write_all(format!("{response}\n").as_bytes())
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "write_stdout".to_string(),
                    cause: e.to_string(),
                })?;
            writer.flush().await.map_err(|e| Error::OperationFailed {
                operation: "flush_stdout".to_string(),
                cause: e.to_string(),
            })?;
        }

        tracing::info!("MCP server input closed");
        Ok(())
    }

    /// Handles one JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(&self, request: &str) -> Option<String> {
        if request.len() > MAX_REQUEST_BODY_SIZE {
            return Some(too_large(request.len()));
        }

        let start = Instant::now();
        let span = info_span!(
            "mcp.request",
            rpc.method = tracing::field::Empty,
            rpc.id = tracing::field::Empty,
            status = tracing::field::Empty
        );

        let parsed: std::result::Result<JsonRpcRequest, _> = serde_json::from_str(request);
        let (response, method_label, status_label) = match parsed {
            Ok(req) => {
                span.record("rpc.method", req.method.as_str());
                if let Some(id) = &req.id {
                    span.record("rpc.id", id.to_string().as_str());
                }
                let is_notification = req.id.is_none();
                let method_label = req.method.clone();

                let result = self
                    .dispatch_method(&req.method, req.params)
                    .instrument(span.clone())
                    .await;
                let status_label = if result.is_ok() { "success" } else { "error" };
                span.record("status", status_label);

                let response = if is_notification {
                    None
                } else {
                    Some(format_response(req.id, result))
                };
                (response, method_label, status_label)
            },
            Err(e) => {
                span.record("status", "parse_error");
                (
                    Some(format_error(None, -32700, &format!("Parse error: {e}"))),
                    "parse_error".to_string(),
                    "error",
                )
            },
        };

        tracing::debug!(
            parent: &span,
            method = %method_label,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Processed MCP request"
        );
        metrics::counter!(
            "mcp_requests_total",
            "method" => method_label,
            "status" => status_label
        )
        .increment(1);

        response
    }

    async fn dispatch_method(&self, method: &str, params: Option<Value>) -> DispatchResult {
        match McpMethod::from(method) {
            McpMethod::Initialize => Ok(handle_initialize()),
            McpMethod::Initialized | McpMethod::Ping => Ok(serde_json::json!({})),
            McpMethod::ListTools => Ok(self.handle_list_tools()),
            McpMethod::CallTool => self.handle_call_tool(params).await,
            McpMethod::Unknown(name) => Err((-32601, format!("Method not found: {name}"))),
        }
    }

    fn handle_list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .list_tools()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        serde_json::json!({ "tools": tools })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or((-32602, "Missing params".to_string()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or((-32602, "Missing tool name".to_string()))?
            .to_string();
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let span = info_span!("mcp.tool.call", tool.name = name.as_str());
        let result = match self.tools.execute(&name, arguments).instrument(span).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool call failed");
                super::ToolResult::error(e.to_string())
            },
        };

        let status_label = if result.is_error { "error" } else { "success" };
        metrics::counter!(
            "mcp_tool_calls_total",
            "tool" => name,
            "status" => status_label
        )
        .increment(1);

        Ok(serde_json::json!({
            "content": result.content,
            "isError": result.is_error
        }))
    }
}

/// One line of input.
enum Frame {
    Line(String),
    /// A line longer than the limit; carries its length in bytes.
    Oversized(usize),
    Eof,
}

/// Reads the next line into `buf`, never buffering more than
/// [`MAX_REQUEST_BODY_SIZE`] bytes of it.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_REQUEST_BODY_SIZE as u64 + 1;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_REQUEST_BODY_SIZE {
        let mut size = buf.len();
        loop {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            if let Some(end) = available.iter().position(|&b| b == b'\n') {
                reader.consume(end + 1);
                size += end;
                break;
            }
            let len = available.len();
            reader.consume(len);
            size += len;
        }
        buf.clear();
        return Ok(Frame::Oversized(size));
    }

    Ok(Frame::Line(String::from_utf8_lossy(buf).into_owned()))
}

fn too_large(size: usize) -> String {
    tracing::warn!(
        request_size = size,
        max_size = MAX_REQUEST_BODY_SIZE,
        "Request exceeds maximum size limit"
    );
    format_error(
        None,
        -32600,
        &format!("Request too large: {size} bytes (max: {MAX_REQUEST_BODY_SIZE} bytes)"),
    )
}

fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Formats a response.
fn format_response(id: Option<Value>, result: DispatchResult) -> String {
    match result {
        Ok(value) => {
            let response = JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(value),
                error: None,
            };
            serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
        },
        Err((code, message)) => format_error(id, code, &message),
    }
}

/// Formats an error response.
fn format_error(id: Option<Value>, code: i32, message: &str) -> String {
    let response = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
        }),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}
