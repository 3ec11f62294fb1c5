//! Tool registry, execution bindings and built-in tools for toolwire.

mod builtins;
mod descriptor;
mod registry;
mod remote;

pub use builtins::{echo_tool, sum_tool};
pub use descriptor::{
    AsyncHandler, ExecutionBinding, HandlerError, HandlerResult, SyncHandler, ToolDescriptor,
};
pub use registry::ToolRegistry;
