//! The bounded loop that alternates between the completion backend and tool
//! execution until the backend produces a final answer.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolwire_tools::ToolRegistry;
use toolwire_types::{
    Completion, CompletionBackend, CompletionRequest, Message, ToolCall, ToolError, ToolOutput,
    TurnError, Usage,
};

/// Backend submissions allowed per turn unless configured otherwise.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Events emitted by the orchestrator during a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// The conversation is being submitted to the backend.
    CompletionStarted { iteration: usize },
    /// A tool is about to be executed.
    ToolStart { name: String, arguments: String },
    /// A tool has finished executing.
    ToolEnd {
        name: String,
        output: String,
        is_error: bool,
    },
    /// Accumulated usage for the turn.
    Usage(Usage),
    /// The backend produced a final answer.
    Done,
    /// The turn was cancelled (e.g. Ctrl+C).
    Cancelled,
}

/// Result of a turn that reached a final answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub usage: Usage,
    /// Backend submissions made during the turn.
    pub iterations: usize,
}

/// Drives one conversation turn against a backend and a tool registry.
pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    registry: ToolRegistry,
    max_iterations: usize,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, registry: ToolRegistry) -> Self {
        Self {
            backend,
            registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the iteration bound. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one turn: submit, execute requested tools, resubmit, until the
    /// backend answers without tool calls or the iteration bound is hit.
    ///
    /// `messages` is the conversation state. Every tool call is appended as
    /// its own assistant message followed by the matching tool result, so
    /// the state stays valid for the next submission. On cancellation an
    /// assistant tool-call message without a result is removed.
    pub async fn run<F>(
        &self,
        messages: &mut Vec<Message>,
        cancel: CancellationToken,
        mut on_event: F,
    ) -> Result<TurnOutcome, TurnError>
    where
        F: FnMut(TurnEvent),
    {
        let mut usage = Usage::default();

        for iteration in 1..=self.max_iterations {
            on_event(TurnEvent::CompletionStarted { iteration });
            tracing::debug!(
                backend = self.backend.name(),
                iteration,
                messages = messages.len(),
                "submitting conversation"
            );

            let mut request = CompletionRequest {
                messages: std::mem::take(messages),
                tools: self.registry.definitions(),
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.backend.complete(&request) => Some(result),
            };

            // Restore messages before acting on the result.
            *messages = std::mem::take(&mut request.messages);

            let Some(result) = result else {
                on_event(TurnEvent::Cancelled);
                return Err(TurnError::Cancelled);
            };
            let Completion {
                message,
                usage: reported,
            } = result?;
            if let Some(reported) = &reported {
                usage.add(reported);
            }

            if message.tool_calls.is_empty() {
                let text = message.text().to_string();
                messages.push(message);
                on_event(TurnEvent::Usage(usage.clone()));
                on_event(TurnEvent::Done);
                return Ok(TurnOutcome {
                    text,
                    usage,
                    iterations: iteration,
                });
            }

            let Message {
                mut content,
                tool_calls,
                ..
            } = message;

            for call in tool_calls {
                messages.push(Message::assistant_tool_call(content.take(), call.clone()));
                on_event(TurnEvent::ToolStart {
                    name: call.name().to_string(),
                    arguments: truncate_for_display(&call.function.arguments, 200),
                });

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = self.execute_call(&call) => Some(result),
                };

                let Some(result) = result else {
                    // The call message has no result yet.
                    messages.pop();
                    on_event(TurnEvent::Cancelled);
                    return Err(TurnError::Cancelled);
                };

                let (output, is_error) = match result {
                    Ok(output) => (output.render(), false),
                    Err(e) => {
                        if matches!(e, ToolError::Session { .. }) {
                            tracing::warn!(tool = call.name(), "tool server failed: {e}");
                        } else {
                            tracing::debug!(tool = call.name(), "tool call failed: {e}");
                        }
                        (format!("Error: {e}"), true)
                    }
                };

                on_event(TurnEvent::ToolEnd {
                    name: call.name().to_string(),
                    output: truncate_for_display(&output, 200),
                    is_error,
                });
                messages.push(Message::tool_result(call.id, output));
            }
        }

        tracing::warn!(
            limit = self.max_iterations,
            "tool-calling loop hit its iteration bound"
        );
        Err(TurnError::ToolLoopExceeded {
            limit: self.max_iterations,
        })
    }

    async fn execute_call(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let arguments = call
            .parse_arguments()
            .map_err(|e| ToolError::InvalidInput {
                tool: call.name().to_string(),
                message: format!("arguments are not valid JSON: {e}"),
            })?;
        self.registry.execute(call.name(), arguments).await
    }
}

fn truncate_for_display(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", toolwire_types::truncate_str(s, max_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_for_display("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string_gets_ellipsis() {
        assert_eq!(truncate_for_display("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let out = truncate_for_display("héllo", 2);
        assert_eq!(out, "h...");
    }
}
