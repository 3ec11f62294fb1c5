//! OpenAI-compatible chat-completions backend for toolwire.

mod client;
mod retry;
mod wire;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiBackend};
pub use retry::RetryConfig;
