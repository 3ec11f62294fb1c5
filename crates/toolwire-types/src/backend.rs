//! Completion backend boundary.

use crate::{BackendError, Completion, CompletionRequest};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a completion backend.
pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<Completion, BackendError>> + Send + 'a>>;

/// A chat-completion service that can answer or request tool calls.
///
/// Dyn-compatible so the orchestrator works with `Arc<dyn CompletionBackend>`.
pub trait CompletionBackend: Send + Sync {
    /// Submit the conversation plus tool schemas and return one completion.
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> BackendFuture<'a>;

    /// Backend name for logging (e.g. "openai").
    fn name(&self) -> &str;
}
