//! Shared conversation types, backend boundary and error hierarchy for toolwire.

pub mod backend;
pub mod error;
pub mod message;
pub mod tool;
pub mod util;

pub use backend::{BackendFuture, CompletionBackend};
pub use error::{BackendError, ConfigError, ToolError, TurnError};
pub use message::*;
pub use tool::*;
pub use util::{tail_str, truncate_str};
