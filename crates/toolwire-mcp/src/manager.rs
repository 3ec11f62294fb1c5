//! Session manager: connects every configured server and keeps what it found.

use crate::config::McpConfig;
use crate::session::{RemoteToolInfo, RpcSession};
use std::sync::Arc;

struct ManagedServer {
    session: Arc<RpcSession>,
    tools: Vec<RemoteToolInfo>,
}

/// Manages connections to multiple tool servers.
pub struct SessionManager {
    servers: Vec<ManagedServer>,
}

impl SessionManager {
    /// Connect all configured servers and discover their tools.
    ///
    /// Servers that fail to start or handshake are logged and skipped; the
    /// caller continues with whatever servers are available. A server whose
    /// discovery fails stays connected with zero tools.
    pub async fn start(config: &McpConfig) -> Self {
        let mut servers = Vec::new();

        for (name, server_config) in &config.servers {
            let session = Arc::new(RpcSession::new(name.clone(), server_config.clone()));
            if let Err(e) = session.connect().await {
                tracing::warn!("Failed to start MCP server '{}': {}", name, e);
                if let Some(stderr) = e.diagnostics() {
                    tracing::warn!("MCP server '{}' stderr:\n{}", name, stderr);
                }
                continue;
            }

            let tools = match session.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!("Tool discovery failed for MCP server '{}': {}", name, e);
                    Vec::new()
                }
            };
            if tools.is_empty() {
                tracing::warn!("MCP server '{}' connected but exposes no tools", name);
            }
            tracing::info!("MCP server '{}' started ({} tools)", name, tools.len());

            servers.push(ManagedServer { session, tools });
        }

        Self { servers }
    }

    /// Get all tools from all connected servers, paired with their session.
    pub fn tools(&self) -> Vec<(Arc<RpcSession>, RemoteToolInfo)> {
        self.servers
            .iter()
            .flat_map(|s| {
                s.tools
                    .iter()
                    .map(move |tool| (Arc::clone(&s.session), tool.clone()))
            })
            .collect()
    }

    /// Number of connected servers.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Connected servers and their tool counts.
    pub fn server_summary(&self) -> Vec<(&str, usize)> {
        self.servers
            .iter()
            .map(|s| (s.session.server_name(), s.tools.len()))
            .collect()
    }

    /// Close all connected servers.
    pub async fn shutdown(&self) {
        for server in &self.servers {
            server.session.close().await;
        }
    }
}
