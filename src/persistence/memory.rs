//! In-memory implementation of [`WorkflowStore`], for tests and as a
//! reference for what a conformant backing store must do.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::clock::{Clock, SystemClock};
use super::store::*;
use crate::workflow::EventType;

/// Internal workflow state: the record plus its history, held together so
/// a single lock acquisition can inspect and mutate both atomically.
struct WorkflowState {
    record: WorkflowRecord,
    history: Vec<HistoryEvent>,
    /// Set for the duration of a `begin_run` / `end_run` pair. Guards
    /// against a second concurrent `run()` driving the same non-sleeping,
    /// non-terminal workflow live (see [`WorkflowStore::begin_run`]).
    in_flight: bool,
}

/// In-memory implementation of [`WorkflowStore`].
///
/// This is the reference backing store used throughout this crate's own
/// tests. It stores all data behind a single [`parking_lot::RwLock`].
/// [`WorkflowStore::begin_run`] takes the write lock for its entire
/// check-wake-claim-and-load sequence and marks the record `in_flight`
/// before releasing it, so a second concurrent `begin_run` for the same id
/// — whether the first caller is mid-wake or already running — observes the
/// claim and gets `BeginRun::AlreadyRunning` instead of a second `Ready`.
///
/// # Example
///
/// ```
/// use durable_engine::persistence::InMemoryWorkflowStore;
///
/// let store = InMemoryWorkflowStore::new();
/// ```
pub struct InMemoryWorkflowStore<C: Clock = SystemClock> {
    workflows: RwLock<HashMap<String, WorkflowState>>,
    clock: Arc<C>,
}

impl InMemoryWorkflowStore<SystemClock> {
    /// Create a store backed by the real wall clock.
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

impl Default for InMemoryWorkflowStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryWorkflowStore<C> {
    /// Create a store backed by a caller-supplied clock (e.g. a
    /// [`super::clock::FakeClock`] in tests that simulate multi-day waits).
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of workflows currently tracked. Handy in tests.
    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }
}

impl<C: Clock> WorkflowStore for InMemoryWorkflowStore<C> {
    fn create(&self, id: &str, class: &str, args: serde_json::Value) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write();
        if workflows.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let now = self.clock.now();
        workflows.insert(
            id.to_string(),
            WorkflowState {
                record: WorkflowRecord {
                    id: id.to_string(),
                    class: class.to_string(),
                    args,
                    status: WorkflowStatus::Running,
                    wake_up_time: None,
                    created_at: now,
                    updated_at: now,
                },
                history: Vec::new(),
                in_flight: false,
            },
        );
        Ok(())
    }

    fn load(&self, id: &str) -> Result<WorkflowRecord, StoreError> {
        self.workflows
            .read()
            .get(id)
            .map(|s| s.record.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn append_event(
        &self,
        id: &str,
        event_type: EventType,
        result: Option<serde_json::Value>,
    ) -> Result<HistoryEvent, StoreError> {
        let mut workflows = self.workflows.write();
        let state = workflows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let event = HistoryEvent {
            seq: state.history.len() as u64 + 1,
            event_type,
            result,
            created_at: self.clock.now(),
        };
        state.history.push(event.clone());
        Ok(event)
    }

    fn history(&self, id: &str) -> Result<Vec<HistoryEvent>, StoreError> {
        self.workflows
            .read()
            .get(id)
            .map(|s| s.history.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
        wake_up_time: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        if status == WorkflowStatus::Sleeping && wake_up_time.is_none() {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                reason: "sleeping status requires a wake_up_time".to_string(),
            });
        }

        let mut workflows = self.workflows.write();
        let state = workflows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        state.record.status = status;
        state.record.wake_up_time = if status == WorkflowStatus::Sleeping {
            wake_up_time
        } else {
            None
        };
        state.record.updated_at = self.clock.now();
        Ok(())
    }

    fn poll_ready(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let workflows = self.workflows.read();

        let mut due: Vec<&WorkflowState> = workflows
            .values()
            .filter(|s| {
                s.record.status == WorkflowStatus::Sleeping
                    && s.record.wake_up_time.is_some_and(|wake| wake <= now)
            })
            .collect();

        due.sort_by_key(|s| s.record.wake_up_time);
        Ok(due
            .into_iter()
            .take(limit)
            .map(|s| s.record.id.clone())
            .collect())
    }

    fn now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }

    fn begin_run(&self, id: &str) -> Result<BeginRun, StoreError> {
        let mut workflows = self.workflows.write();
        let now = self.clock.now();
        let state = workflows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if state.record.status.is_terminal() {
            return Ok(BeginRun::AlreadyTerminal(state.record.status));
        }

        if state.record.status == WorkflowStatus::Sleeping {
            let wake_up_time = state
                .record
                .wake_up_time
                .expect("sleeping workflow always has a wake_up_time");
            if wake_up_time > now {
                return Ok(BeginRun::NotDue { wake_up_time });
            }

            // A sleeping, due workflow cannot be in_flight (wake handling
            // and the live branch that would set in_flight both require
            // status == running), so no claim check is needed here.

            // Wake handling: exactly one `timer_completed` event per
            // transition out of sleeping, performed before the body runs.
            let event = HistoryEvent {
                seq: state.history.len() as u64 + 1,
                event_type: EventType::TimerCompleted,
                result: None,
                created_at: now,
            };
            state.history.push(event);
            state.record.status = WorkflowStatus::Running;
            state.record.wake_up_time = None;
            state.record.updated_at = now;
        } else if state.in_flight {
            // Already running and already claimed by an earlier begin_run:
            // reject this caller rather than hand out a second Ready for
            // the same id.
            return Ok(BeginRun::AlreadyRunning);
        }

        state.in_flight = true;

        Ok(BeginRun::Ready {
            record: state.record.clone(),
            history: state.history.clone(),
        })
    }

    fn end_run(&self, id: &str) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write();
        let state = workflows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        state.in_flight = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FakeClock;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_create_and_load() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({"n": 1})).unwrap();

        let record = store.load("wf-1").unwrap();
        assert_eq!(record.class, "demo");
        assert_eq!(record.status, WorkflowStatus::Running);
        assert!(record.wake_up_time.is_none());
    }

    #[test]
    fn test_create_duplicate_fails() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();
        assert!(matches!(
            store.create("wf-1", "demo", json!({})),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_load_missing_fails() {
        let store = InMemoryWorkflowStore::new();
        assert!(matches!(store.load("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_append_event_preserves_order() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();

        let e1 = store
            .append_event("wf-1", EventType::ActivityCompleted, Some(json!("a")))
            .unwrap();
        let e2 = store
            .append_event("wf-1", EventType::SideEffectCompleted, Some(json!("b")))
            .unwrap();

        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);

        let history = store.history("wf-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].result, Some(json!("a")));
        assert_eq!(history[1].result, Some(json!("b")));
    }

    #[test]
    fn test_update_status_requires_wake_time_for_sleeping() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();

        let result = store.update_status("wf-1", WorkflowStatus::Sleeping, None);
        assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    }

    #[test]
    fn test_update_status_clears_wake_time_on_non_sleeping() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();

        let wake = Utc::now() + chrono::Duration::days(1);
        store
            .update_status("wf-1", WorkflowStatus::Sleeping, Some(wake))
            .unwrap();
        assert_eq!(store.load("wf-1").unwrap().wake_up_time, Some(wake));

        store
            .update_status("wf-1", WorkflowStatus::Completed, None)
            .unwrap();
        assert_eq!(store.load("wf-1").unwrap().wake_up_time, None);
    }

    #[test]
    fn test_poll_ready_respects_wake_time() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FakeClock::new(start));
        let store = InMemoryWorkflowStore::with_clock(clock.clone());
        store.create("wf-1", "demo", json!({})).unwrap();

        let wake = start + chrono::Duration::days(7);
        store
            .update_status("wf-1", WorkflowStatus::Sleeping, Some(wake))
            .unwrap();

        assert!(store.poll_ready(10).unwrap().is_empty());

        clock.set(wake + chrono::Duration::seconds(1));
        assert_eq!(store.poll_ready(10).unwrap(), vec!["wf-1".to_string()]);
    }

    #[test]
    fn test_poll_ready_respects_limit_and_fairness() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FakeClock::new(start));
        let store = InMemoryWorkflowStore::with_clock(clock.clone());

        for (i, offset) in [3, 1, 2].into_iter().enumerate() {
            let id = format!("wf-{i}");
            store.create(&id, "demo", json!({})).unwrap();
            store
                .update_status(
                    &id,
                    WorkflowStatus::Sleeping,
                    Some(start + chrono::Duration::seconds(offset)),
                )
                .unwrap();
        }

        clock.advance(chrono::Duration::seconds(10));
        let ready = store.poll_ready(2).unwrap();
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0], "wf-1"); // offset 1s, most overdue first
        assert_eq!(ready[1], "wf-2"); // offset 2s
    }

    #[test]
    fn test_begin_run_wakes_sleeping_due_workflow() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FakeClock::new(start));
        let store = InMemoryWorkflowStore::with_clock(clock.clone());
        store.create("wf-1", "demo", json!({})).unwrap();

        let wake = start + chrono::Duration::days(7);
        store
            .update_status("wf-1", WorkflowStatus::Sleeping, Some(wake))
            .unwrap();

        clock.set(wake + chrono::Duration::seconds(1));
        match store.begin_run("wf-1").unwrap() {
            BeginRun::Ready { record, history } => {
                assert_eq!(record.status, WorkflowStatus::Running);
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].event_type, EventType::TimerCompleted);
            }
            _ => panic!("expected Ready"),
        }
    }

    #[test]
    fn test_begin_run_is_noop_when_not_due() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FakeClock::new(start));
        let store = InMemoryWorkflowStore::with_clock(clock.clone());
        store.create("wf-1", "demo", json!({})).unwrap();

        let wake = start + chrono::Duration::days(7);
        store
            .update_status("wf-1", WorkflowStatus::Sleeping, Some(wake))
            .unwrap();

        match store.begin_run("wf-1").unwrap() {
            BeginRun::NotDue { wake_up_time } => assert_eq!(wake_up_time, wake),
            _ => panic!("expected NotDue"),
        }
        // And history was not touched.
        assert!(store.history("wf-1").unwrap().is_empty());
    }

    #[test]
    fn test_begin_run_is_noop_on_terminal_workflow() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();
        store
            .update_status("wf-1", WorkflowStatus::Completed, None)
            .unwrap();

        match store.begin_run("wf-1").unwrap() {
            BeginRun::AlreadyTerminal(WorkflowStatus::Completed) => {}
            _ => panic!("expected AlreadyTerminal(Completed)"),
        }
    }

    #[test]
    fn test_begin_run_rejects_concurrent_claim_on_running_workflow() {
        let store = InMemoryWorkflowStore::new();
        store.create("wf-1", "demo", json!({})).unwrap();

        // A freshly created workflow is already `running`; the first
        // begin_run claims it.
        match store.begin_run("wf-1").unwrap() {
            BeginRun::Ready { .. } => {}
            _ => panic!("expected Ready"),
        }

        // A second concurrent begin_run must not also get Ready.
        assert!(matches!(
            store.begin_run("wf-1").unwrap(),
            BeginRun::AlreadyRunning
        ));

        // Once released, the next begin_run can claim it again.
        store.end_run("wf-1").unwrap();
        match store.begin_run("wf-1").unwrap() {
            BeginRun::Ready { .. } => {}
            _ => panic!("expected Ready after end_run"),
        }
    }

    #[test]
    fn test_end_run_missing_workflow_fails() {
        let store = InMemoryWorkflowStore::new();
        assert!(matches!(
            store.end_run("missing"),
            Err(StoreError::NotFound(_))
        ));
    }
}
