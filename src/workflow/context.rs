//! The cooperative suspension primitive consumed by workflow bodies.
//!
//! A workflow body runs on a dedicated OS thread. At each suspension point
//! it sends a [`Request`] up to the orchestrator over an mpsc channel and
//! blocks on a second channel for the resumed value. This gives the body
//! true stackful-coroutine semantics: arbitrary local variables survive a
//! suspension within one `run()` invocation, because the body's call stack
//! simply isn't unwound — it's parked on a channel receive.
//!
//! Across `run()` invocations nothing here is preserved: a fresh thread and
//! fresh channels are created every time, and the previous thread (if it
//! was left suspended on a timer, or the live branch failed without
//! resuming it) is abandoned. See [`super::orchestrator`] for how.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use serde_json::Value;

use crate::activity::{Activity, ActivityError};

use super::duration::parse_duration;
use super::{EventType, WorkflowError};

/// A suspension request yielded by a workflow body.
pub(crate) enum Request {
    Activity(Box<dyn Activity>),
    Timer(Duration),
    SideEffect(Box<dyn FnOnce() -> Result<Value, ActivityError> + Send>),
}

impl Request {
    /// The history event type this request resolves to once completed.
    pub(crate) fn event_type(&self) -> EventType {
        match self {
            Request::Activity(_) => EventType::ActivityCompleted,
            Request::Timer(_) => EventType::TimerCompleted,
            Request::SideEffect(_) => EventType::SideEffectCompleted,
        }
    }
}

/// A message sent from the workflow body thread to the orchestrator.
pub(crate) enum Step {
    /// The body yielded a suspension and is now blocked waiting to be
    /// resumed.
    Suspend(Request),
    /// The body returned (or raised) and will not run again.
    Finished(Result<Value, WorkflowError>),
}

/// Handed to a workflow body's [`super::Workflow::run`] method. This is the
/// only way a body communicates with the orchestrator.
pub struct WorkflowContext {
    tx_req: Sender<Step>,
    rx_resume: Receiver<Value>,
}

impl WorkflowContext {
    pub(crate) fn new(tx_req: Sender<Step>, rx_resume: Receiver<Value>) -> Self {
        Self { tx_req, rx_resume }
    }

    /// Send the body's final result upward. Called once, after
    /// [`super::Workflow::run`] returns, by the thread harness — not by
    /// workflow bodies directly.
    pub(crate) fn finished(&self, result: Result<Value, WorkflowError>) {
        // If the orchestrator has already stopped listening (this run was
        // abandoned earlier) there's nobody left to deliver this to.
        let _ = self.tx_req.send(Step::Finished(result));
    }

    fn suspend(&self, request: Request) -> Result<Value, WorkflowError> {
        if self.tx_req.send(Step::Suspend(request)).is_err() {
            return Err(WorkflowError::abandoned());
        }
        self.rx_resume.recv().map_err(|_| WorkflowError::abandoned())
    }

    /// Invoke an activity and return its result.
    ///
    /// On first execution this performs the activity's `handle()` call
    /// live and persists the result; on replay it resumes immediately with
    /// the previously recorded result, never invoking `handle()` again.
    pub fn execute<A: Activity + 'static>(&self, activity: A) -> Result<Value, WorkflowError> {
        self.suspend(Request::Activity(Box::new(activity)))
    }

    /// Suspend until `duration` has elapsed.
    ///
    /// `duration` is a relative-time expression such as `"7 days"` or
    /// `"30 minutes"`. This always persists a `sleeping` status and returns
    /// control to the orchestrator's caller — even for a zero-length
    /// duration — and the body's in-memory state is discarded; the next
    /// `run()` will rebuild it by replaying history.
    pub fn wait(&self, duration: &str) -> Result<(), WorkflowError> {
        let parsed = parse_duration(duration).map_err(|e| WorkflowError::new(e.to_string()))?;
        self.suspend(Request::Timer(parsed)).map(|_| ())
    }

    /// Run an inline computation exactly once across all replays.
    ///
    /// Use this for non-deterministic operations (random numbers, current
    /// time, UUID generation) that must be stable on replay but don't
    /// warrant a full [`Activity`] implementation.
    pub fn side_effect<F>(&self, thunk: F) -> Result<Value, WorkflowError>
    where
        F: FnOnce() -> Result<Value, ActivityError> + Send + 'static,
    {
        self.suspend(Request::SideEffect(Box::new(thunk)))
    }
}
