//! Tool descriptors and their execution bindings.

use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use toolwire_mcp::{RemoteToolInfo, RpcSession};
use toolwire_types::{ToolDefinition, ToolError, ToolOutput};

/// Error type returned by local tool handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a local handler returns.
pub type HandlerResult = Result<serde_json::Value, HandlerError>;

/// A local handler invoked synchronously.
pub type SyncHandler = Arc<dyn Fn(serde_json::Value) -> HandlerResult + Send + Sync>;

/// A local handler whose result is awaited.
pub type AsyncHandler = Arc<
    dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>
        + Send
        + Sync,
>;

/// How a tool is executed.
#[derive(Clone)]
pub enum ExecutionBinding {
    Sync(SyncHandler),
    Async(AsyncHandler),
    /// Proxied to `tools/call` on a handshaken session.
    Remote {
        session: Arc<RpcSession>,
        tool: String,
    },
}

impl fmt::Debug for ExecutionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionBinding::Sync(_) => f.write_str("Sync"),
            ExecutionBinding::Async(_) => f.write_str("Async"),
            ExecutionBinding::Remote { session, tool } => f
                .debug_struct("Remote")
                .field("server", &session.server_name())
                .field("tool", tool)
                .finish(),
        }
    }
}

/// A named, schema-described, executable tool.
#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub binding: ExecutionBinding,
}

impl ToolDescriptor {
    /// A tool backed by a synchronous local function.
    pub fn local<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            binding: ExecutionBinding::Sync(Arc::new(handler)),
        }
    }

    /// A tool backed by an async local function.
    pub fn local_async<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |args| Box::pin(handler(args)));
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            binding: ExecutionBinding::Async(handler),
        }
    }

    /// A tool proxied to a server, with the server's tool name bound.
    pub fn remote(session: Arc<RpcSession>, info: RemoteToolInfo) -> Self {
        Self {
            binding: ExecutionBinding::Remote {
                session,
                tool: info.name.clone(),
            },
            name: info.name,
            description: info.description,
            parameters: info.input_schema,
        }
    }

    /// The definition offered to the completion backend.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.binding, ExecutionBinding::Remote { .. })
    }

    /// Run the binding. Handler errors and panics come back as
    /// [`ToolError::Execution`]; a failed server call keeps its [`McpError`]
    /// as the source of [`ToolError::Session`].
    ///
    /// [`McpError`]: toolwire_mcp::McpError
    pub async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let failed = |cause: String| ToolError::Execution {
            tool: self.name.clone(),
            cause,
        };

        match &self.binding {
            ExecutionBinding::Sync(handler) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| handler(arguments))) {
                    Ok(Ok(value)) => Ok(ToolOutput::new(value)),
                    Ok(Err(e)) => Err(failed(e.to_string())),
                    Err(panic) => Err(failed(panic_message(panic.as_ref()))),
                }
            }
            ExecutionBinding::Async(handler) => {
                match AssertUnwindSafe(handler(arguments)).catch_unwind().await {
                    Ok(Ok(value)) => Ok(ToolOutput::new(value)),
                    Ok(Err(e)) => Err(failed(e.to_string())),
                    Err(panic) => Err(failed(panic_message(panic.as_ref()))),
                }
            }
            ExecutionBinding::Remote { session, tool } => {
                let result = session
                    .call_tool(tool, arguments)
                    .await
                    .map_err(|e| ToolError::Session {
                        tool: self.name.clone(),
                        source: Box::new(e),
                    })?;
                crate::remote::into_output(result).map_err(failed)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("tool panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("tool panicked: {s}")
    } else {
        "tool panicked".to_string()
    }
}
