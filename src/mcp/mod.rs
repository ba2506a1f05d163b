//! MCP server implementation.
//!
//! Exposes the bulk operations as Model Context Protocol tools:
//! `firebulk_export`, `firebulk_import`, `firebulk_delete`, `firebulk_get`,
//! `firebulk_set` and `firebulk_list`.
//!
//! ## Usage
//!
//! ```bash
//! firebulk serve
//! ```
//!
//! ### Client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "firebulk": {
//!       "command": "firebulk",
//!       "args": ["serve"]
//!     }
//!   }
//! }
//! ```

mod dispatch;
mod server;
mod tools;

pub use dispatch::McpMethod;
pub use server::{MAX_REQUEST_BODY_SIZE, McpServer};
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
