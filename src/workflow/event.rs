//! History event types
//!
//! A workflow's history is the append-only record of resolved suspensions.
//! Every suspension kind a workflow body can yield corresponds to exactly
//! one event type here.

use serde::{Deserialize, Serialize};

/// The kind of a resolved suspension, as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// An activity's `handle()` call completed.
    ActivityCompleted,
    /// A durable timer elapsed.
    TimerCompleted,
    /// An inline side-effect thunk completed.
    SideEffectCompleted,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ActivityCompleted => "activity_completed",
            Self::TimerCompleted => "timer_completed",
            Self::SideEffectCompleted => "side_effect_completed",
        };
        write!(f, "{s}")
    }
}
