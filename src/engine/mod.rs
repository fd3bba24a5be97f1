//! Workflow orchestration engine
//!
//! The engine module provides the [`Orchestrator`], which drives a single
//! workflow's replay loop (§4.2): load or fail, handle a due wake-up exactly
//! once, instantiate the body via the [`WorkflowRegistry`], and drive it
//! through history until it suspends live or returns.

mod orchestrator;
mod registry;

pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError, RunOutcome};
pub use registry::WorkflowRegistry;
