//! The worker: a polling loop that keeps due workflows moving (§4.3).
//!
//! The worker is intentionally simple. It has no concurrency of its own —
//! on each tick it polls the store for ready workflow ids and drives each
//! one, in order, on the calling thread. A per-workflow failure is logged
//! and does not stop the tick from continuing to the next id, matching the
//! isolation Scenario D requires (one workflow waking up broken must not
//! prevent its neighbor from completing).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::engine::{Orchestrator, OrchestratorError};
use crate::persistence::{StoreError, WorkflowStore};

/// Configuration for the worker's polling loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often `start()` polls the store for ready workflows.
    pub poll_interval: Duration,
    /// Maximum workflow ids claimed per poll; forwarded to `poll_ready()`.
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
        }
    }
}

/// Errors from a single worker tick.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Polls a [`WorkflowStore`] for ready workflows and drives each through
/// an [`Orchestrator`].
pub struct Worker<S: WorkflowStore> {
    orchestrator: Orchestrator<S>,
    config: WorkerConfig,
    stop: Arc<AtomicBool>,
}

impl<S: WorkflowStore> Worker<S> {
    /// Create a worker over `orchestrator` with default configuration.
    pub fn new(orchestrator: Orchestrator<S>) -> Self {
        Self::with_config(orchestrator, WorkerConfig::default())
    }

    /// Create a worker with explicit configuration.
    pub fn with_config(orchestrator: Orchestrator<S>, config: WorkerConfig) -> Self {
        Self {
            orchestrator,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The underlying orchestrator, e.g. to call `store()` for workflow
    /// creation before starting the loop.
    pub fn orchestrator(&self) -> &Orchestrator<S> {
        &self.orchestrator
    }

    /// Signal a running `start()` loop to stop after its current tick.
    /// Safe to call from another thread.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Run one poll-and-drive tick: claim up to `batch_size` ready
    /// workflow ids and run each to its next suspension or completion.
    /// Does not sleep. Returns the number of workflows driven.
    ///
    /// Intended for tests, which want a single deterministic tick rather
    /// than a background loop.
    #[instrument(skip(self))]
    pub fn run_once(&self) -> Result<usize, WorkerError> {
        let ready = self.orchestrator.store().poll_ready(self.config.batch_size)?;
        let count = ready.len();
        for id in ready {
            match self.orchestrator.run(&id) {
                Ok(outcome) => debug!(workflow_id = %id, ?outcome, "worker drove workflow"),
                Err(err) => warn!(workflow_id = %id, error = %err, "worker failed to drive workflow"),
            }
        }
        Ok(count)
    }

    /// Poll and drive workflows on `poll_interval` until `stop()` is
    /// called. Blocks the calling thread; spawn onto a dedicated thread
    /// to run in the background.
    pub fn start(&self) {
        self.stop.store(false, Ordering::SeqCst);
        while !self.stop.load(Ordering::SeqCst) {
            if let Err(err) = self.run_once() {
                warn!(error = %err, "worker tick failed");
            }
            thread::sleep(self.config.poll_interval);
        }
    }
}
