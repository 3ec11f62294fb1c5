//! Bounded tool-calling orchestration for toolwire.

pub mod orchestrator;

pub use orchestrator::{DEFAULT_MAX_ITERATIONS, Orchestrator, TurnEvent, TurnOutcome};
