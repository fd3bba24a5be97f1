//! # Durable Execution Engine
//!
//! A replay-based workflow orchestration engine: workflow bodies run as
//! ordinary synchronous Rust functions that suspend at durable points
//! (activities, timers, side effects) and are replayed from recorded
//! history on every re-entry, so a body observes a single consistent
//! sequence of results no matter how many times the process restarts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │  drives one workflow's body through its recorded history,   │
//! │  resolving new suspensions live and appending to history    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WorkflowStore                           │
//! │  workflow records + append-only history (in-memory impl       │
//! │  provided; a durable backend implements the same trait)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Worker                              │
//! │  polls the store for due workflows and drives each in turn   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use durable_engine::prelude::*;
//! use serde::Deserialize;
//! use serde_json::{json, Value};
//!
//! #[derive(Deserialize)]
//! struct SignupArgs { email: String }
//!
//! struct SignupWorkflow { args: SignupArgs }
//!
//! impl Workflow for SignupWorkflow {
//!     const TYPE: &'static str = "signup";
//!     type Args = SignupArgs;
//!
//!     fn new(args: Self::Args) -> Self {
//!         Self { args }
//!     }
//!
//!     fn run(self, ctx: &WorkflowContext) -> Result<Value, WorkflowError> {
//!         ctx.wait("7 days")?;
//!         Ok(json!(format!("welcomed {}", self.args.email)))
//!     }
//! }
//!
//! let store = InMemoryWorkflowStore::new();
//! let mut orchestrator = Orchestrator::new(store);
//! orchestrator.register::<SignupWorkflow>();
//! orchestrator.store().create("w1", "signup", json!({"email": "a@example.com"}))?;
//! orchestrator.run("w1")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod activity;
pub mod engine;
pub mod persistence;
pub mod worker;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{Activity, ActivityError};
    pub use crate::engine::{Orchestrator, OrchestratorConfig, OrchestratorError, RunOutcome};
    pub use crate::persistence::{
        BeginRun, Clock, FakeClock, HistoryEvent, InMemoryWorkflowStore, StoreError, SystemClock,
        WorkflowRecord, WorkflowStatus, WorkflowStore,
    };
    pub use crate::worker::{Worker, WorkerConfig, WorkerError};
    pub use crate::workflow::{parse_duration, EventType, Workflow, WorkflowContext, WorkflowError};
}

// Re-export key types at crate root
pub use activity::{Activity, ActivityError};
pub use engine::{Orchestrator, OrchestratorConfig, OrchestratorError, RunOutcome};
pub use persistence::{InMemoryWorkflowStore, StoreError, WorkflowStatus, WorkflowStore};
pub use worker::{Worker, WorkerConfig, WorkerError};
pub use workflow::{Workflow, WorkflowContext, WorkflowError};
