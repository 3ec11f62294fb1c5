//! Stdio JSON-RPC client for MCP tool servers.
//!
//! Each configured server is spawned as a child process that speaks
//! newline-delimited JSON-RPC 2.0 on stdin/stdout. A [`RpcSession`] owns one
//! such process, performs the `initialize` handshake and then serves strictly
//! sequential calls (`tools/list`, `tools/call`, or any other method).

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod manager;
pub mod session;
pub mod transport;

pub use config::{McpConfig, ServerConfig};
pub use error::McpError;
pub use manager::SessionManager;
pub use session::{RemoteToolInfo, RpcSession};
pub use transport::LineTransport;
