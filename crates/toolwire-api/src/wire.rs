//! Chat-completions request and response bodies.

use serde::{Deserialize, Serialize};
use toolwire_types::{
    BackendError, Completion, CompletionRequest, FunctionTool, Message, Usage,
};

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn new(model: &'a str, request: &'a CompletionRequest) -> Self {
        let tools: Vec<FunctionTool<'a>> =
            request.tools.iter().map(|t| t.as_function()).collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");
        Self {
            model,
            messages: &request.messages,
            tools,
            tool_choice,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

impl ChatResponse {
    /// Take the first choice as the completion.
    pub(crate) fn into_completion(self) -> Result<Completion, BackendError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("response contained no choices".into()))?;
        Ok(Completion {
            message: choice.message,
            usage: self.usage,
        })
    }
}
