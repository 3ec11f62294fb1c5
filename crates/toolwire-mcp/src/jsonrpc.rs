//! JSON-RPC 2.0 envelopes for MCP communication.

use serde::{Deserialize, Serialize};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    /// Create a new request. `Null` params are sent as an empty object.
    pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params: object_or_empty(params),
        }
    }
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params: object_or_empty(params),
        }
    }
}

fn object_or_empty(params: serde_json::Value) -> serde_json::Value {
    match params {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Either side of a response: a result (which may be `null`) or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(serde_json::Value),
    Error(JsonRpcError),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub id: Option<u64>,
    pub outcome: ResponseOutcome,
}

/// One line read from a server.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(JsonRpcResponse),
    /// A server-initiated request or notification.
    ServerMessage { method: String },
}

impl Inbound {
    /// Parse one line. The error string describes why the line is not a
    /// valid envelope.
    pub fn parse(line: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| format!("invalid JSON: {e}"))?;
        let obj = value
            .as_object()
            .ok_or_else(|| "envelope is not a JSON object".to_string())?;

        if let Some(method) = obj.get("method").and_then(|m| m.as_str()) {
            return Ok(Inbound::ServerMessage {
                method: method.to_string(),
            });
        }

        let id = match obj.get("id") {
            None | Some(serde_json::Value::Null) => None,
            Some(raw) => Some(
                raw.as_u64()
                    .ok_or_else(|| format!("id {raw} is not a non-negative integer"))?,
            ),
        };

        let outcome = if let Some(err) = obj.get("error") {
            let err: JsonRpcError = serde_json::from_value(err.clone())
                .map_err(|e| format!("invalid error object: {e}"))?;
            ResponseOutcome::Error(err)
        } else if let Some(result) = obj.get("result") {
            ResponseOutcome::Result(result.clone())
        } else {
            return Err("response has neither result nor error".to_string());
        };

        Ok(Inbound::Response(JsonRpcResponse { id, outcome }))
    }
}
