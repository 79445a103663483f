//! MCP client over newline-delimited JSON-RPC.
//!
//! [`McpClient`] works over any async reader/writer pair; [`StdioClient`]
//! is the same client attached to a spawned server's stdout/stdin. Requests
//! are strictly sequential: one request in flight, answered before the next
//! is sent.

use crate::error::{McpClientError, McpResult};
use crate::protocol::{
    CallToolParams, CallToolResult, ClientCapabilities, Implementation, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse,
    ListToolsParams, ListToolsResult, Tool, PROTOCOL_VERSION,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use teams_mcp_core::config::ServerConfig;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// How long a server gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on `tools/list` pages fetched by one [`McpClient::list_tools`].
const MAX_TOOL_PAGES: usize = 100;

/// Launch parameters for a stdio server. The child inherits this process's
/// environment, with `env` applied on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParams {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ServerParams {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

/// List and call tools; the seam the smoke test is written against.
#[async_trait::async_trait]
pub trait ToolSession: Send {
    async fn list_tools(&mut self) -> McpResult<Vec<Tool>>;
    async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<CallToolResult>;
}

pub struct McpClient<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
    timeout: Option<Duration>,
    child: Option<Child>,
    /// Bytes of a frame not yet terminated by a newline. Kept on the client
    /// so a timed out read resumes mid-frame on the next request.
    pending: Vec<u8>,
}

/// Client attached to a spawned server process.
pub type StdioClient = McpClient<BufReader<ChildStdout>, ChildStdin>;

impl StdioClient {
    /// Start the server with piped stdin/stdout. Its stderr goes to ours.
    pub async fn spawn(params: &ServerParams, timeout: Option<Duration>) -> McpResult<Self> {
        tracing::debug!(command = %params.command, args = ?params.args, "Starting MCP server");

        let mut command = Command::new(&params.command);
        command
            .args(&params.args)
            .envs(params.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &params.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| McpClientError::Spawn {
            command: params.command.clone(),
            source,
        })?;
        let stdin = child.stdin.take().ok_or(McpClientError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(McpClientError::MissingPipe("stdout"))?;

        let mut client = McpClient::new(BufReader::new(stdout), stdin).with_timeout(timeout);
        client.child = Some(child);
        Ok(client)
    }
}

impl<R, W> McpClient<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
            timeout: None,
            child: None,
            pending: Vec::new(),
        }
    }

    /// Per-request limit on waiting for a response; `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `initialize` followed by the `notifications/initialized` notification.
    pub async fn initialize(&mut self, client_name: &str) -> McpResult<InitializeResult> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: client_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let result: InitializeResult = self
            .request("initialize", serde_json::to_value(params)?)
            .await?;

        if result.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                server = %result.protocol_version,
                client = PROTOCOL_VERSION,
                "Server negotiated a different protocol version"
            );
        }

        self.send(&JsonRpcRequest::notification("notifications/initialized", None))
            .await?;
        Ok(result)
    }

    /// All advertised tools, following `nextCursor` pages. A cursor seen
    /// twice, or more than [`MAX_TOOL_PAGES`] pages, is a protocol error.
    pub async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;
        for _ in 0..MAX_TOOL_PAGES {
            let params = serde_json::to_value(ListToolsParams { cursor })?;
            let page: ListToolsResult = self.request("tools/list", params).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen.insert(next.clone()) {
                        return Err(McpClientError::Protocol(format!(
                            "tools/list returned cursor `{next}` twice"
                        )));
                    }
                    cursor = Some(next);
                }
                _ => return Ok(tools),
            }
        }
        Err(McpClientError::Protocol(format!(
            "tools/list did not finish within {MAX_TOOL_PAGES} pages"
        )))
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })?;
        self.request("tools/call", params).await
    }

    /// Close stdin and wait for the server to exit, killing it after a grace
    /// period.
    pub async fn shutdown(self) -> McpResult<()> {
        let Self { writer, child, .. } = self;
        drop(writer);

        if let Some(mut child) = child {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    tracing::debug!(%status, "MCP server exited");
                }
                Err(_) => {
                    tracing::warn!("MCP server still running after stdin closed, killing it");
                    child.kill().await?;
                }
            }
        }
        Ok(())
    }

    async fn request<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> McpResult<T> {
        let id = self.next_id;
        self.next_id += 1;

        self.send(&JsonRpcRequest::new(id, method, params)).await?;

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_response(id))
                .await
                .map_err(|_| McpClientError::Timeout {
                    method: method.to_string(),
                    after: limit,
                })??,
            None => self.read_response(id).await?,
        };

        if let Some(error) = response.error {
            return Err(McpClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.ok_or_else(|| {
            McpClientError::Protocol(format!("response to `{method}` has no result"))
        })?;
        Ok(serde_json::from_value(result)?)
    }

    async fn send<T: Serialize>(&mut self, frame: &T) -> McpResult<()> {
        let mut line = serde_json::to_string(frame)?;
        tracing::debug!(frame = %line, "-> server");
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read frames until the response to `id` arrives. Notifications are
    /// logged, server requests answered, and anything else skipped.
    async fn read_response(&mut self, id: u64) -> McpResult<JsonRpcMessage> {
        loop {
            // read_until leaves partial bytes in `pending` if this future is
            // dropped by the request timeout.
            if self.reader.read_until(b'\n', &mut self.pending).await? == 0 {
                return Err(McpClientError::Closed);
            }
            let bytes = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&bytes);
            let frame = line.trim();
            if frame.is_empty() {
                continue;
            }
            tracing::debug!(frame, "<- server");

            let message: JsonRpcMessage = match serde_json::from_str(frame) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping non JSON-RPC line on server stdout");
                    continue;
                }
            };

            if message.is_response_to(id) {
                return Ok(message);
            }
            match (message.method.as_deref(), message.id.clone()) {
                (Some(method), Some(request_id)) => {
                    self.answer_server_request(request_id, method).await?
                }
                (Some(method), None) => tracing::debug!(method, "Server notification"),
                (None, other) => tracing::debug!(id = ?other, "Ignoring unmatched response"),
            }
        }
    }

    /// Servers may ping us; everything else is unsupported.
    async fn answer_server_request(&mut self, id: Value, method: &str) -> McpResult<()> {
        let response = match method {
            "ping" => JsonRpcResponse::success(id, Value::Object(Default::default())),
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(method)),
        };
        self.send(&response).await
    }
}

#[async_trait::async_trait]
impl<R, W> ToolSession for McpClient<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        McpClient::call_tool(self, name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, DuplexStream, ReadHalf, WriteHalf};

    type TestClient = McpClient<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// A scripted server on the far end of an in-memory pipe.
    struct FakeServer {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeServer {
        async fn recv(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().expect("client frame");
            serde_json::from_str(&line).unwrap()
        }

        async fn send(&mut self, frame: Value) {
            self.send_raw(&frame.to_string()).await;
        }

        async fn send_raw(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }
    }

    fn pair() -> (TestClient, FakeServer) {
        let (client_end, server_end) = duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_end);
        let (server_read, server_write) = tokio::io::split(server_end);
        (
            McpClient::new(BufReader::new(client_read), client_write),
            FakeServer {
                lines: BufReader::new(server_read).lines(),
                writer: server_write,
            },
        )
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let request = server.recv().await;
            assert_eq!(request["method"], "initialize");
            assert_eq!(request["params"]["protocolVersion"], PROTOCOL_VERSION);
            assert_eq!(request["params"]["clientInfo"]["name"], "test-teams-mcp");
            server
                .send(json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "result": {
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {"tools": {"listChanged": false}},
                        "serverInfo": {"name": "Microsoft Teams MCP", "version": "1.9.4"}
                    }
                }))
                .await;

            let initialized = server.recv().await;
            assert_eq!(initialized["method"], "notifications/initialized");
            assert!(initialized.get("id").is_none());
        });

        let result = client.initialize("test-teams-mcp").await.unwrap();
        assert_eq!(result.server_info.name, "Microsoft Teams MCP");
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let first = server.recv().await;
            assert!(first["params"].get("cursor").is_none());
            server
                .send(json!({
                    "jsonrpc": "2.0", "id": first["id"],
                    "result": {"tools": [{"name": "mcp_graph_teams_listTeams", "description": "List teams"}], "nextCursor": "2"}
                }))
                .await;

            let second = server.recv().await;
            assert_eq!(second["params"]["cursor"], "2");
            server
                .send(json!({
                    "jsonrpc": "2.0", "id": second["id"],
                    "result": {"tools": [{"name": "mcp_graph_chat_listChats"}]}
                }))
                .await;
        });

        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["mcp_graph_teams_listTeams", "mcp_graph_chat_listChats"]);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_tools_rejects_repeated_cursor() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let mut requests = 0;
            while let Ok(Some(line)) = server.lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                requests += 1;
                server
                    .send(json!({
                        "jsonrpc": "2.0", "id": request["id"],
                        "result": {"tools": [], "nextCursor": "same"}
                    }))
                    .await;
            }
            requests
        });

        let error = client.list_tools().await.unwrap_err();
        assert!(matches!(error, McpClientError::Protocol(ref m) if m.contains("`same`")));

        drop(client);
        assert_eq!(server_task.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_tools_stops_after_page_limit() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let mut requests = 0;
            while let Ok(Some(line)) = server.lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                requests += 1;
                server
                    .send(json!({
                        "jsonrpc": "2.0", "id": request["id"],
                        "result": {"tools": [], "nextCursor": format!("page-{requests}")}
                    }))
                    .await;
            }
            requests
        });

        let error = client.list_tools().await.unwrap_err();
        assert!(matches!(error, McpClientError::Protocol(_)));

        drop(client);
        assert_eq!(server_task.await.unwrap(), MAX_TOOL_PAGES);
    }

    #[tokio::test]
    async fn test_call_tool_skips_noise_and_answers_ping() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let call = server.recv().await;
            assert_eq!(call["method"], "tools/call");
            assert_eq!(call["params"]["name"], "mcp_graph_chat_listChats");
            assert_eq!(call["params"]["arguments"]["$top"], 5);

            server.send_raw("INFO: Graph client ready").await;
            server
                .send(json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}}))
                .await;
            server
                .send(json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"}))
                .await;

            let pong = server.recv().await;
            assert_eq!(pong["id"], "srv-1");
            assert_eq!(pong["result"], json!({}));

            server
                .send(json!({
                    "jsonrpc": "2.0", "id": call["id"],
                    "result": {"content": [{"type": "text", "text": "[]"}]}
                }))
                .await;
        });

        let result = client
            .call_tool("mcp_graph_chat_listChats", json!({"$top": 5}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("[]"));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rpc_error_is_returned() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let call = server.recv().await;
            server
                .send(json!({
                    "jsonrpc": "2.0", "id": call["id"],
                    "error": {"code": -32602, "message": "Unknown tool: nope"}
                }))
                .await;
        });

        let error = client.call_tool("nope", json!({})).await.unwrap_err();
        match error {
            McpClientError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Unknown tool: nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (mut client, server) = pair();
        drop(server);

        let error = client.list_tools().await.unwrap_err();
        assert!(matches!(error, McpClientError::Closed | McpClientError::Io(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let (client, _server) = pair();
        let mut client = client.with_timeout(Some(Duration::from_secs(2)));

        let error = client.list_tools().await.unwrap_err();
        assert!(matches!(error, McpClientError::Timeout { ref method, .. } if method == "tools/list"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_split_across_timeout_is_kept() {
        let (client, mut server) = pair();
        let mut client = client.with_timeout(Some(Duration::from_secs(2)));

        let server_task = tokio::spawn(async move {
            let first = server.recv().await;
            assert_eq!(first["method"], "tools/list");
            // Half of a ping request, then nothing until the client retries.
            server.writer.write_all(br#"{"jsonrpc":"2.0","id":"srv-1","#).await.unwrap();

            let second = server.recv().await;
            server.send_raw(r#""method":"ping"}"#).await;

            let pong = server.recv().await;
            assert_eq!(pong["id"], "srv-1");
            server
                .send(json!({
                    "jsonrpc": "2.0", "id": second["id"],
                    "result": {"tools": [{"name": "mcp_graph_teams_listTeams"}]}
                }))
                .await;
        });

        let error = client.list_tools().await.unwrap_err();
        assert!(matches!(error, McpClientError::Timeout { .. }));

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "mcp_graph_teams_listTeams");
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_command() {
        let params = ServerParams::new("definitely-not-a-real-server-7f3a", vec![]);
        let error = match StdioClient::spawn(&params, None).await {
            Ok(_) => panic!("spawn should fail"),
            Err(e) => e,
        };
        assert!(matches!(error, McpClientError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdio_roundtrip_with_shell_server() {
        let script = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"sh","version":"0"}}}' ;;
    *'"method":"tools/list"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo"}]}}' ;;
  esac
done
"#;
        let params = ServerParams::new("sh", vec!["-c".to_string(), script.to_string()]);
        let mut client = StdioClient::spawn(&params, Some(Duration::from_secs(10)))
            .await
            .unwrap();

        let info = client.initialize("test").await.unwrap();
        assert_eq!(info.server_info.name, "sh");
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");

        client.shutdown().await.unwrap();
    }
}
