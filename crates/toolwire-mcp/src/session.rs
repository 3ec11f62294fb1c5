//! RPC session over one handshaken connection to one tool server.
//!
//! Handles the MCP handshake (`initialize` + `notifications/initialized`),
//! tool discovery (`tools/list`) and tool invocation (`tools/call`). Requests
//! are strictly sequential: the session lock is held from the write of a
//! request until its response line has been read.

use crate::config::ServerConfig;
use crate::error::McpError;
use crate::jsonrpc::{Inbound, JsonRpcNotification, JsonRpcRequest, ResponseOutcome};
use crate::transport::LineTransport;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Information about a tool exposed by a server. No execution binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolsListResult {
    Bare(Vec<ToolEntry>),
    Wrapped {
        #[serde(default)]
        tools: Vec<ToolEntry>,
    },
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "toolwire_types::empty_object_schema", rename = "inputSchema", alias = "parameters")]
    input_schema: serde_json::Value,
}

enum SessionState {
    Idle,
    Ready(Connection),
    Closed,
}

struct Connection {
    transport: LineTransport,
    next_id: u64,
    /// Requests written but not yet answered. An id stays here when its
    /// caller timed out or dropped the call, so a late reply can be skipped.
    outstanding: HashSet<u64>,
}

/// Client for a single tool server process.
pub struct RpcSession {
    name: String,
    config: ServerConfig,
    state: Mutex<SessionState>,
}

impl RpcSession {
    /// Create an unconnected session. Nothing is spawned until [`connect`].
    ///
    /// [`connect`]: RpcSession::connect
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// Spawn the server and perform the handshake.
    ///
    /// Any handshake failure terminates the process and leaves the session
    /// unconnected. Connecting an already connected session is a no-op;
    /// connecting a closed session starts a fresh process.
    pub async fn connect(&self) -> Result<(), McpError> {
        let mut state = self.state.lock().await;
        if matches!(*state, SessionState::Ready(_)) {
            return Ok(());
        }

        let transport = LineTransport::start(
            &self.config.command,
            &self.config.args,
            &self.config.env,
            self.config.inherit_env,
        )?;
        let mut conn = Connection {
            transport,
            next_id: 1,
            outstanding: HashSet::new(),
        };

        match self.handshake(&mut conn).await {
            Ok(()) => {
                *state = SessionState::Ready(conn);
                Ok(())
            }
            Err(e) => {
                conn.transport.terminate().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, conn: &mut Connection) -> Result<(), McpError> {
        let init_params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "toolwire",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = exchange(
            &self.name,
            conn,
            "initialize",
            init_params,
            self.config.handshake_timeout(),
        )
        .await
        .map_err(|e| McpError::Handshake {
            server: self.name.clone(),
            reason: e.to_string(),
        })?;

        if let Some(info) = result.get("serverInfo") {
            tracing::info!(
                server = %self.name,
                "handshake complete with {} {}",
                info.get("name").and_then(|v| v.as_str()).unwrap_or("unknown"),
                info.get("version").and_then(|v| v.as_str()).unwrap_or("")
            );
        }

        let notification =
            JsonRpcNotification::new("notifications/initialized", serde_json::Value::Null);
        let line = serde_json::to_string(&notification)?;
        if let Err(e) = conn.transport.write_line(&line).await {
            // The next call will report the dead process.
            tracing::warn!(server = %self.name, "failed to send initialized notification: {e}");
        }
        Ok(())
    }

    /// Send one request and wait up to `timeout` for its response.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, McpError> {
        let mut state = self.state.lock().await;
        let SessionState::Ready(conn) = &mut *state else {
            return Err(McpError::NotConnected {
                server: self.name.clone(),
            });
        };
        exchange(&self.name, conn, method, params, timeout).await
    }

    /// Discover the server's tools, in the order the server lists them.
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>, McpError> {
        let result = self
            .call("tools/list", serde_json::json!({}), self.config.call_timeout())
            .await?;
        parse_tools_list(result).map_err(|reason| McpError::Malformed {
            server: self.name.clone(),
            method: "tools/list".to_string(),
            reason,
        })
    }

    /// Call a tool on this server. The result is returned as-is.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let arguments = match arguments {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });
        self.call("tools/call", params, self.config.call_timeout())
            .await
    }

    /// Terminate the server process. Safe to call repeatedly and before
    /// `connect` has ever succeeded.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let SessionState::Ready(mut conn) = std::mem::replace(&mut *state, SessionState::Closed)
        {
            conn.transport.terminate().await;
            tracing::info!(server = %self.name, "MCP server closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Ready(_))
    }

    /// Get the server name.
    pub fn server_name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Write one request and read until its response arrives or `timeout` elapses.
async fn exchange(
    server: &str,
    conn: &mut Connection,
    method: &str,
    params: serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, McpError> {
    let id = conn.next_id;
    conn.next_id += 1;

    let request = JsonRpcRequest::new(id, method, params);
    let line = serde_json::to_string(&request)?;
    tracing::debug!(server, id, method, "-> {line}");

    let no_response = |diagnostics: String| McpError::NoResponse {
        server: server.to_string(),
        method: method.to_string(),
        diagnostics,
    };

    match conn.transport.write_line(&line).await {
        Ok(()) => {}
        Err(McpError::BrokenPipe(_)) => {
            return Err(no_response(conn.transport.drain_diagnostics()));
        }
        Err(e) => return Err(e),
    }
    conn.outstanding.insert(id);

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let raw = match conn.transport.read_line(remaining).await {
            Ok(raw) => raw,
            Err(McpError::ReadTimeout { diagnostics, .. }) => {
                return Err(McpError::Timeout {
                    server: server.to_string(),
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                    diagnostics,
                });
            }
            Err(McpError::Eof { diagnostics }) => return Err(no_response(diagnostics)),
            Err(McpError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(McpError::Malformed {
                    server: server.to_string(),
                    method: method.to_string(),
                    reason: format!("invalid UTF-8 in response line: {e}"),
                });
            }
            Err(e) => return Err(e),
        };

        if raw.trim().is_empty() {
            continue;
        }
        tracing::debug!(server, id, "<- {raw}");

        let response = match Inbound::parse(&raw) {
            Ok(Inbound::Response(response)) => response,
            Ok(Inbound::ServerMessage { method: incoming }) => {
                tracing::debug!(server, "ignoring server message '{incoming}'");
                continue;
            }
            Err(reason) => {
                return Err(McpError::Malformed {
                    server: server.to_string(),
                    method: method.to_string(),
                    reason,
                });
            }
        };

        match response.id {
            Some(got) if got == id => {
                conn.outstanding.remove(&id);
            }
            // Late answer to an abandoned request.
            Some(got) if conn.outstanding.remove(&got) => {
                tracing::warn!(server, "discarding stale response id {got} (waiting for {id})");
                continue;
            }
            other => {
                return Err(McpError::Malformed {
                    server: server.to_string(),
                    method: method.to_string(),
                    reason: format!("expected response id {id}, got {other:?}"),
                });
            }
        }

        return match response.outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(err) => Err(McpError::Remote {
                server: server.to_string(),
                method: method.to_string(),
                code: err.code,
                message: err.message,
                data: err.data,
            }),
        };
    }
}

/// Accept `{tools: [...]}`, a bare list, or an empty result.
fn parse_tools_list(result: serde_json::Value) -> Result<Vec<RemoteToolInfo>, String> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    let list: ToolsListResult = serde_json::from_value(result)
        .map_err(|e| format!("failed to parse tools/list result: {e}"))?;
    let entries = match list {
        ToolsListResult::Bare(entries) => entries,
        ToolsListResult::Wrapped { tools } => tools,
    };
    Ok(entries
        .into_iter()
        .map(|t| RemoteToolInfo {
            name: t.name,
            description: t.description.unwrap_or_default(),
            input_schema: t.input_schema,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_tool_entry() {
        let json = r#"{
            "name": "read_file",
            "description": "Read a file",
            "inputSchema": {
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }
        }"#;
        let entry: ToolEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.name, "read_file");
        assert_eq!(entry.description.as_deref(), Some("Read a file"));
        assert_eq!(entry.input_schema["required"][0], "path");
    }

    #[test]
    fn tool_entry_accepts_parameters_key() {
        let json = r#"{"name": "scrape", "parameters": {"type": "object", "properties": {"url": {"type": "string"}}}}"#;
        let entry: ToolEntry = serde_json::from_str(json).unwrap();
        assert!(entry.input_schema["properties"]["url"].is_object());
    }

    #[test]
    fn tool_entry_without_schema_gets_empty_object() {
        let entry: ToolEntry = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert!(entry.description.is_none());
        assert_eq!(entry.input_schema, toolwire_types::empty_object_schema());
    }

    #[test]
    fn tools_list_wrapped_preserves_order() {
        let result = serde_json::json!({
            "tools": [
                {"name": "b", "inputSchema": {"type": "object"}},
                {"name": "a", "description": "Tool A", "inputSchema": {"type": "object"}}
            ]
        });
        let tools = parse_tools_list(result).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(tools[0].description, "");
        assert_eq!(tools[1].description, "Tool A");
    }

    #[test]
    fn tools_list_bare_list() {
        let result = serde_json::json!([{"name": "echo", "description": "Echo"}]);
        let tools = parse_tools_list(result).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
    }

    #[test]
    fn tools_list_empty_shapes_are_zero_tools() {
        assert!(parse_tools_list(serde_json::Value::Null).unwrap().is_empty());
        assert!(parse_tools_list(serde_json::json!({})).unwrap().is_empty());
        assert!(parse_tools_list(serde_json::json!({"tools": []})).unwrap().is_empty());
        assert!(parse_tools_list(serde_json::json!([])).unwrap().is_empty());
    }

    #[test]
    fn tools_list_rejects_nameless_entries() {
        let result = serde_json::json!({"tools": [{"description": "no name"}]});
        assert!(parse_tools_list(result).is_err());
    }

    #[tokio::test]
    async fn call_before_connect_is_not_connected() {
        let session = RpcSession::new("idle", ServerConfig::new("cat", vec![]));
        let err = session
            .call("tools/list", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::NotConnected { .. }));
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn close_before_connect_is_harmless() {
        let session = RpcSession::new("idle", ServerConfig::new("cat", vec![]));
        session.close().await;
        session.close().await;
        assert!(matches!(
            session.call_tool("echo", serde_json::json!({})).await,
            Err(McpError::NotConnected { .. })
        ));
    }

    #[tokio::test]
    async fn connect_to_missing_binary_is_spawn_error() {
        let session = RpcSession::new(
            "missing",
            ServerConfig::new("this_command_does_not_exist_xyz123", vec![]),
        );
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, McpError::Spawn { .. }));
    }
}
