//! Error hierarchy for toolwire.

use thiserror::Error;

/// Errors that end a conversation turn without a final answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Completion backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Tool-calling loop exceeded {limit} iterations without a final answer")]
    ToolLoopExceeded { limit: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Errors from a chat-completion backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode completion: {0}")]
    Decode(String),

    #[error("Request timeout")]
    Timeout,
}

/// Errors from the tool registry and tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("Unknown tool: {name}")]
    NotFound { name: String },

    #[error("Invalid input for tool '{tool}': {message}")]
    InvalidInput { tool: String, message: String },

    #[error("Tool '{tool}' failed: {cause}")]
    Execution { tool: String, cause: String },

    /// The server hosting a remote tool could not complete the call.
    #[error("Tool '{tool}' failed: {source}")]
    Session {
        tool: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
