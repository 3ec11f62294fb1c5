//! Error types for MCP operations.

use thiserror::Error;

/// Errors from the line transport and the RPC session.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Handshake with MCP server '{server}' failed: {reason}")]
    Handshake { server: String, reason: String },

    #[error("MCP server '{server}' is not connected")]
    NotConnected { server: String },

    #[error("Failed to write to server stdin: {0}")]
    BrokenPipe(#[source] std::io::Error),

    #[error("Server closed its output stream")]
    Eof { diagnostics: String },

    #[error("No line received within {timeout_ms}ms")]
    ReadTimeout { timeout_ms: u64, diagnostics: String },

    #[error("MCP server '{server}' timed out after {timeout_ms}ms on '{method}'")]
    Timeout {
        server: String,
        method: String,
        timeout_ms: u64,
        diagnostics: String,
    },

    #[error("MCP server '{server}' closed the connection without answering '{method}'")]
    NoResponse {
        server: String,
        method: String,
        diagnostics: String,
    },

    #[error("Malformed response from '{server}' to '{method}': {reason}")]
    Malformed {
        server: String,
        method: String,
        reason: String,
    },

    #[error("JSON-RPC error from '{server}' on '{method}' (code {code}): {message}")]
    Remote {
        server: String,
        method: String,
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Captured server stderr attached to this error, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            McpError::Eof { diagnostics }
            | McpError::ReadTimeout { diagnostics, .. }
            | McpError::Timeout { diagnostics, .. }
            | McpError::NoResponse { diagnostics, .. } => {
                Some(diagnostics.as_str()).filter(|d| !d.is_empty())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_exposed_for_timeouts() {
        let err = McpError::Timeout {
            server: "fs".into(),
            method: "tools/call".into(),
            timeout_ms: 30000,
            diagnostics: "panic: boom\n".into(),
        };
        assert_eq!(err.diagnostics(), Some("panic: boom\n"));
    }

    #[test]
    fn empty_diagnostics_are_none() {
        let err = McpError::NoResponse {
            server: "fs".into(),
            method: "tools/call".into(),
            diagnostics: String::new(),
        };
        assert!(err.diagnostics().is_none());
    }

    #[test]
    fn remote_error_display() {
        let err = McpError::Remote {
            server: "fs".into(),
            method: "tools/call".into(),
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        assert_eq!(
            err.to_string(),
            "JSON-RPC error from 'fs' on 'tools/call' (code -32601): Method not found"
        );
    }
}
