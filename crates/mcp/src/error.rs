//! Error types for the MCP stdio client.

use std::time::Duration;

/// Result type for client operations.
pub type McpResult<T> = Result<T, McpClientError>;

#[derive(Debug, thiserror::Error)]
pub enum McpClientError {
    /// The server process could not be started.
    #[error("failed to start server `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child was spawned without the expected pipe.
    #[error("server {0} is not piped")]
    MissingPipe(&'static str),

    #[error("I/O error talking to server: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// The server closed stdout before answering.
    #[error("server closed the connection")]
    Closed,

    #[error("no response to `{method}` within {}s", .after.as_secs())]
    Timeout { method: String, after: Duration },

    /// A frame that is valid JSON but not a valid response.
    #[error("invalid response: {0}")]
    Protocol(String),
}
