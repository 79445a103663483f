// MCP (Model Context Protocol) stdio client and the Teams smoke test built on it

pub mod catalog;
pub mod client;
pub mod error;
pub mod protocol;
pub mod smoke;

pub use client::{McpClient, ServerParams, StdioClient, ToolSession};
pub use error::{McpClientError, McpResult};
