//! Activity abstractions
//!
//! An activity is a single opaque, synchronous operation invoked by the
//! orchestrator on behalf of a workflow body. There is no retry policy, no
//! heartbeat, and no cancellation token: a failing activity always fails
//! its parent workflow.

mod definition;

pub use definition::{Activity, ActivityError};
