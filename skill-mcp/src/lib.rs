//! skill-mcp: an MCP server that lets an agent list skills, manage their
//! variables and run their scripts or ad-hoc Python against them.

pub mod mcp;

pub use mcp::{serve, serve_mcp_stdio, McpServer, ToolResponse};
