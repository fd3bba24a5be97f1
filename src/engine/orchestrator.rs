//! The replay loop: drives a single workflow to its next suspension or to
//! completion.
//!
//! Each `run()` invocation spawns the workflow body on a dedicated thread
//! and drives it through a cursor over its recorded history. Once the
//! cursor reaches the end, any further suspension is resolved live
//! (invoking the activity, running the thunk, or persisting a sleep) and
//! appended to history. See the module docs on [`crate::workflow::context`]
//! for how the thread/channel mechanics give the body coroutine semantics.

use std::sync::mpsc;
use std::thread;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::persistence::{BeginRun, StoreError, WorkflowStatus, WorkflowStore};
use crate::workflow::{Request, Step, WorkflowContext};

use super::registry::WorkflowRegistry;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Safety cap on history length. A workflow whose history grows beyond
    /// this is marked `failed` rather than replayed indefinitely; it
    /// usually indicates a body that never reaches a timer or return.
    pub max_history_len: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_history_len: 10_000,
        }
    }
}

/// Errors that prevent `run()` from ever starting to drive the workflow.
/// Contrast with [`RunOutcome::Failed`], which means the engine *did* run
/// and the workflow itself ended up `failed`.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("workflow not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The OS refused to spawn the dedicated thread a workflow body runs
    /// on (thread ulimit, OOM). Distinct from a logic invariant: this can
    /// genuinely happen under load and must not take down the caller's
    /// poll loop.
    #[error("failed to spawn workflow body thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// What happened when `run()` was called.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The body returned. `result` is surfaced for caller convenience; it
    /// is not part of the persisted schema (only `status` is).
    Completed { result: Value },
    /// The body suspended on a timer; status is now `sleeping`.
    Sleeping { wake_up_time: chrono::DateTime<chrono::Utc> },
    /// The workflow ended up (or already was) `failed`.
    Failed { reason: String },
    /// The workflow was already terminal; nothing happened.
    AlreadyTerminal(WorkflowStatus),
    /// The workflow is sleeping but not yet due; nothing happened.
    NotDue { wake_up_time: chrono::DateTime<chrono::Utc> },
    /// Another caller is already mid-`run` for this id; nothing happened.
    /// The caller should retry later rather than treat this as a failure.
    AlreadyRunning,
}

/// Drives workflows forward via the replay loop in §4.2.
pub struct Orchestrator<S: WorkflowStore> {
    store: S,
    registry: WorkflowRegistry,
    config: OrchestratorConfig,
}

impl<S: WorkflowStore> Orchestrator<S> {
    /// Create an orchestrator over `store` with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, OrchestratorConfig::default())
    }

    /// Create an orchestrator with explicit configuration.
    pub fn with_config(store: S, config: OrchestratorConfig) -> Self {
        Self {
            store,
            registry: WorkflowRegistry::new(),
            config,
        }
    }

    /// Register a workflow type so `run()` can resolve its `class`.
    pub fn register<W: crate::workflow::Workflow>(&mut self) {
        self.registry.register::<W>();
    }

    /// Register a bare factory function under `class`, bypassing the
    /// [`crate::workflow::Workflow`] trait. See
    /// [`WorkflowRegistry::register_fn`].
    pub fn register_fn<F>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn(Value, &WorkflowContext) -> Result<Value, crate::workflow::WorkflowError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_fn(class, factory);
    }

    /// The underlying store, e.g. to call `create()` or `poll_ready()`.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drive workflow `id` to its next suspension or to completion.
    ///
    /// Returns `Err` only when `run()` itself could not be attempted at all
    /// (unknown id, or a store I/O failure). Any failure that happens
    /// *during* a genuine attempt to run the workflow is reported as
    /// `Ok(RunOutcome::Failed { .. })` — the engine successfully recorded
    /// that the workflow is now failed, which is a normal, not an
    /// exceptional, outcome.
    #[instrument(skip(self), fields(workflow_id = %id))]
    pub fn run(&self, id: &str) -> Result<RunOutcome, OrchestratorError> {
        let begin = self
            .store
            .begin_run(id)
            .map_err(|e| match e {
                StoreError::NotFound(id) => OrchestratorError::NotFound(id),
                other => OrchestratorError::Store(other),
            })?;

        let (record, history) = match begin {
            BeginRun::AlreadyTerminal(status) => {
                debug!(status = %status, "run() on already-terminal workflow is a no-op");
                return Ok(RunOutcome::AlreadyTerminal(status));
            }
            BeginRun::NotDue { wake_up_time } => {
                debug!(%wake_up_time, "run() on a not-yet-due sleeping workflow is a no-op");
                return Ok(RunOutcome::NotDue { wake_up_time });
            }
            BeginRun::AlreadyRunning => {
                debug!("run() on an already in-flight workflow is a no-op");
                return Ok(RunOutcome::AlreadyRunning);
            }
            BeginRun::Ready { record, history } => (record, history),
        };

        // The store now considers this workflow claimed. Every path out of
        // run_claimed below, success or failure, must be matched by
        // releasing that claim, or the workflow is locked out of all
        // future runs.
        let outcome = self.run_claimed(id, record, history);

        if let Err(err) = self.store.end_run(id) {
            warn!(error = %err, "failed to release in-flight claim after run");
        }

        outcome
    }

    fn run_claimed(
        &self,
        id: &str,
        record: crate::persistence::WorkflowRecord,
        history: Vec<crate::persistence::HistoryEvent>,
    ) -> Result<RunOutcome, OrchestratorError> {
        if history.len() > self.config.max_history_len {
            warn!(len = history.len(), "workflow history exceeds configured limit");
            self.store.update_status(id, WorkflowStatus::Failed, None)?;
            return Ok(RunOutcome::Failed {
                reason: format!(
                    "history length {} exceeds max_history_len {}",
                    history.len(),
                    self.config.max_history_len
                ),
            });
        }

        let factory = match self.registry.get(&record.class) {
            Some(factory) => factory,
            None => {
                let reason = format!("unknown workflow class: {}", record.class);
                warn!(class = %record.class, "unknown workflow class");
                self.store.update_status(id, WorkflowStatus::Failed, None)?;
                return Ok(RunOutcome::Failed { reason });
            }
        };

        self.drive(id, record.args, history, factory)
    }

    fn drive(
        &self,
        id: &str,
        args: Value,
        history: Vec<crate::persistence::HistoryEvent>,
        factory: std::sync::Arc<
            dyn Fn(Value, &WorkflowContext) -> Result<Value, crate::workflow::WorkflowError>
                + Send
                + Sync,
        >,
    ) -> Result<RunOutcome, OrchestratorError> {
        let (tx_req, rx_req) = mpsc::channel::<Step>();
        let (tx_resume, rx_resume) = mpsc::channel::<Value>();

        let ctx = WorkflowContext::new(tx_req, rx_resume);
        let handle = thread::Builder::new()
            .name(format!("workflow-{id}"))
            .spawn(move || {
                let result = factory(args, &ctx);
                ctx.finished(result);
            })?;

        let mut cursor = 0usize;
        loop {
            let step = match rx_req.recv() {
                Ok(step) => step,
                Err(_) => {
                    // The body thread died without reporting Finished: a
                    // panic outside of any suspension point (e.g. an
                    // unrelated `unwrap()` in the body).
                    let _ = handle.join();
                    self.store.update_status(id, WorkflowStatus::Failed, None)?;
                    return Ok(RunOutcome::Failed {
                        reason: "workflow body thread terminated unexpectedly".to_string(),
                    });
                }
            };

            let request = match step {
                Step::Finished(Ok(result)) => {
                    let _ = handle.join();
                    self.store.update_status(id, WorkflowStatus::Completed, None)?;
                    info!("workflow completed");
                    return Ok(RunOutcome::Completed { result });
                }
                Step::Finished(Err(err)) => {
                    let _ = handle.join();
                    self.store.update_status(id, WorkflowStatus::Failed, None)?;
                    info!(reason = %err, "workflow failed");
                    return Ok(RunOutcome::Failed {
                        reason: err.to_string(),
                    });
                }
                Step::Suspend(request) => request,
            };

            // Replay branch: the next historical event resolves this
            // suspension without doing any real work.
            if cursor < history.len() {
                let event = &history[cursor];
                if event.event_type != request.event_type() {
                    warn!(
                        expected = %event.event_type,
                        yielded = %request.event_type(),
                        "non-deterministic replay: kind mismatch"
                    );
                    drop(tx_resume);
                    let _ = handle.join();
                    self.store.update_status(id, WorkflowStatus::Failed, None)?;
                    return Ok(RunOutcome::Failed {
                        reason: format!(
                            "non-deterministic replay: workflow yielded {:?} but history has {:?} at this position",
                            request.event_type(),
                            event.event_type
                        ),
                    });
                }

                let value = event.result.clone().unwrap_or(Value::Null);
                cursor += 1;
                if tx_resume.send(value).is_err() {
                    let _ = handle.join();
                    self.store.update_status(id, WorkflowStatus::Failed, None)?;
                    return Ok(RunOutcome::Failed {
                        reason: "workflow body thread exited unexpectedly during replay".to_string(),
                    });
                }
                continue;
            }

            // Live branch: history is exhausted, so this suspension is
            // resolved by doing the work for real.
            match request {
                Request::Activity(activity) => match activity.handle() {
                    Ok(result) => {
                        self.store.append_event(
                            id,
                            crate::workflow::EventType::ActivityCompleted,
                            Some(result.clone()),
                        )?;
                        if tx_resume.send(result).is_err() {
                            let _ = handle.join();
                            self.store.update_status(id, WorkflowStatus::Failed, None)?;
                            return Ok(RunOutcome::Failed {
                                reason: "workflow body thread exited unexpectedly".to_string(),
                            });
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "activity failed");
                        drop(tx_resume);
                        let _ = handle.join();
                        self.store.update_status(id, WorkflowStatus::Failed, None)?;
                        return Ok(RunOutcome::Failed {
                            reason: err.to_string(),
                        });
                    }
                },
                Request::SideEffect(thunk) => match thunk() {
                    Ok(result) => {
                        self.store.append_event(
                            id,
                            crate::workflow::EventType::SideEffectCompleted,
                            Some(result.clone()),
                        )?;
                        if tx_resume.send(result).is_err() {
                            let _ = handle.join();
                            self.store.update_status(id, WorkflowStatus::Failed, None)?;
                            return Ok(RunOutcome::Failed {
                                reason: "workflow body thread exited unexpectedly".to_string(),
                            });
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "side effect failed");
                        drop(tx_resume);
                        let _ = handle.join();
                        self.store.update_status(id, WorkflowStatus::Failed, None)?;
                        return Ok(RunOutcome::Failed {
                            reason: err.to_string(),
                        });
                    }
                },
                Request::Timer(duration) => {
                    let wake_up_time = self.store.now()
                        + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
                    self.store
                        .update_status(id, WorkflowStatus::Sleeping, Some(wake_up_time))?;
                    // Abandon: drop the resume channel so the body thread's
                    // blocked recv() unwinds via WorkflowError::abandoned(),
                    // then reap it. Its in-memory state is gone; the next
                    // run() rebuilds it from history.
                    drop(tx_resume);
                    let _ = handle.join();
                    info!(%wake_up_time, "workflow suspended on timer");
                    return Ok(RunOutcome::Sleeping { wake_up_time });
                }
            }
        }
    }
}
