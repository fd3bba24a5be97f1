//! WorkflowStore trait definition
//!
//! The store is the durability boundary: an append-only history per
//! workflow plus a mutable record of status and wake time. Every method is
//! synchronous — the orchestrator makes blocking calls into it and is
//! intentionally not async (see [`crate::engine`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::EventType;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `load`, `append_event`, `update_status`, or `begin_run` referenced an
    /// id that was never created.
    #[error("workflow not found: {0}")]
    NotFound(String),

    /// `create` was called with an id that already exists.
    #[error("workflow already exists: {0}")]
    AlreadyExists(String),

    /// `update_status` was asked to set `status = sleeping` without a wake
    /// time, or a non-sleeping status with one. See invariant 3: `status =
    /// sleeping` iff `wake_up_time` is set.
    #[error("invalid status transition for workflow {id}: {reason}")]
    InvalidTransition { id: String, reason: String },
}

/// Workflow status.
///
/// `Completed` and `Failed` are terminal: once reached, no further mutation
/// of the record or its history occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// The orchestrator is actively driving this workflow, or it is between
    /// runs but not suspended on a timer.
    Running,
    /// Suspended on a timer; `wake_up_time` names when it becomes eligible
    /// for `poll_ready`.
    Sleeping,
    /// The body returned successfully.
    Completed,
    /// The body raised, or the engine could not drive it (unknown class,
    /// non-deterministic replay).
    Failed,
}

impl WorkflowStatus {
    /// Whether this status is sticky — no further status transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Sleeping => write!(f, "sleeping"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One row of a workflow's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Strictly increasing position within this workflow, starting at 1.
    pub seq: u64,
    pub event_type: EventType,
    /// Nullable: timers carry no payload; activities/side-effects may
    /// themselves return `null`.
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// The mutable record tracked per workflow instance.
#[derive(Debug, Clone)]
pub struct WorkflowRecord {
    pub id: String,
    /// Symbolic name resolved through the caller's [`crate::engine::WorkflowRegistry`].
    pub class: String,
    pub args: serde_json::Value,
    pub status: WorkflowStatus,
    /// Non-null iff `status == Sleeping`.
    pub wake_up_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`WorkflowStore::begin_run`]: the store's answer to "should
/// the engine actually drive this workflow right now, and with what
/// history?"
pub enum BeginRun {
    /// The workflow is runnable now. Wake handling (if it was asleep and
    /// due) has already happened; `history` reflects that.
    Ready {
        record: WorkflowRecord,
        history: Vec<HistoryEvent>,
    },
    /// The workflow is sleeping but its wake time has not arrived.
    /// Calling `run` in this state is a no-op.
    NotDue { wake_up_time: DateTime<Utc> },
    /// The workflow already reached a terminal status. Calling `run` in
    /// this state is a no-op.
    AlreadyTerminal(WorkflowStatus),
    /// Another caller is already mid-`run` for this id (a prior `begin_run`
    /// has not yet been matched by `end_run`). Calling `run` in this state
    /// is a no-op; the caller should retry later rather than drive the
    /// workflow body concurrently with the in-flight run.
    AlreadyRunning,
}

/// Durable storage of workflow records and history, plus the time source.
///
/// All operations are synchronous. A conformant implementation must
/// preserve read-your-writes: once a caller observes a mutation, every
/// subsequent caller (including a different thread) must observe it too.
pub trait WorkflowStore: Send + Sync {
    /// Insert a new record with `status = running` and empty history.
    /// Fails with [`StoreError::AlreadyExists`] if `id` is already present.
    fn create(&self, id: &str, class: &str, args: serde_json::Value) -> Result<(), StoreError>;

    /// Load a workflow's current record.
    fn load(&self, id: &str) -> Result<WorkflowRecord, StoreError>;

    /// Append one history row, stamped with the store's current time.
    /// Must preserve strict per-workflow insertion order.
    fn append_event(
        &self,
        id: &str,
        event_type: EventType,
        result: Option<serde_json::Value>,
    ) -> Result<HistoryEvent, StoreError>;

    /// Return the full ordered history for a workflow, oldest first.
    fn history(&self, id: &str) -> Result<Vec<HistoryEvent>, StoreError>;

    /// Atomically update status and (optionally) wake time. If
    /// `wake_up_time` is `Some`, it is stored (`status` should be
    /// `Sleeping`); if `None` and `status != Sleeping`, any existing wake
    /// time is cleared.
    fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
        wake_up_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Return up to `limit` ids with `status = sleeping` and `wake_up_time
    /// <= now`. Never returns an id whose wake time is in the future.
    /// Ordering across calls must be fair over time (this implementation
    /// returns the longest-overdue ids first).
    fn poll_ready(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    /// The store's current time. Owned by the store so tests can
    /// substitute a fake clock; see [`crate::persistence::FakeClock`].
    fn now(&self) -> DateTime<Utc>;

    /// Atomically prepare a workflow for a `run()` invocation: perform wake
    /// handling (append a `timer_completed` event and transition
    /// `sleeping -> running`) if, and only if, the workflow is sleeping and
    /// due, then claim the workflow for this caller and return the record
    /// and full history, all under a single lock.
    ///
    /// This is this store's concurrency guard (see the module-level docs in
    /// [`crate::engine`]): a workflow that is not terminal and not sleeping
    /// is either idle or already claimed by an earlier `begin_run` whose
    /// matching [`WorkflowStore::end_run`] has not yet run. The claim makes
    /// `Ready` exclusive — at most one caller holds it for a given id at a
    /// time — which is what makes "at most one orchestrator runs a given
    /// workflow" possible without an external lock manager. A second
    /// concurrent caller gets `BeginRun::AlreadyRunning` instead of a second
    /// `Ready`.
    fn begin_run(&self, id: &str) -> Result<BeginRun, StoreError>;

    /// Release the claim taken by a matching `begin_run` that returned
    /// `Ready`. Must be called exactly once per `Ready`, regardless of
    /// whether the run that followed succeeded, failed, or could not even
    /// be attempted — otherwise the workflow is locked out of all future
    /// runs.
    fn end_run(&self, id: &str) -> Result<(), StoreError>;
}
