//! Configuration types for MCP servers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

fn default_timeout() -> u64 {
    30000
}

fn default_handshake_timeout() -> u64 {
    10000
}

/// Top-level MCP configuration. Servers are kept in name order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// Configuration for a single MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command to run (e.g., "npx", "python").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment for the server process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Start from the parent environment instead of only `env`.
    #[serde(default)]
    pub inherit_env: bool,
    /// Timeout for requests in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Timeout for the `initialize` handshake in milliseconds (default: 10000).
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
            inherit_env: false,
            timeout_ms: default_timeout(),
            handshake_timeout_ms: default_handshake_timeout(),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}
