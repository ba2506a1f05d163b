//! Serve CLI command (MCP server).

use super::CliContext;
use crate::Result;
use crate::mcp::McpServer;

/// Runs the MCP server on stdio until the client closes stdin.
///
/// # Errors
///
/// Returns an error if stdio fails.
pub async fn execute(context: &CliContext) -> Result<()> {
    let server = McpServer::new(context.store.clone(), context.config.limits);
    server.run_stdio().await
}
