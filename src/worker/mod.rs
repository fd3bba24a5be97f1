//! The worker: a simple polling loop over the [`crate::engine::Orchestrator`]
//!
//! See [`Worker`] for the polling contract (§4.3): `start()` loops on an
//! interval until stopped, `run_once()` drives a single tick for tests.

mod worker;

pub use worker::{Worker, WorkerConfig, WorkerError};
