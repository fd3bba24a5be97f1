//! Workflow trait definition

use serde::de::DeserializeOwned;

use super::WorkflowContext;

/// Error type for workflow failures.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct WorkflowError {
    /// Error message.
    pub message: String,

    /// Error code for programmatic handling.
    pub code: Option<String>,
}

impl WorkflowError {
    /// Create a new workflow error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Internal sentinel returned by a suspended [`WorkflowContext`] call
    /// once the orchestrator has abandoned this run (the body will never be
    /// resumed again). The body is expected to propagate it with `?` and
    /// unwind; the orchestrator has already decided the run's outcome by
    /// the time this is observed, so the value itself is never inspected.
    pub(crate) fn abandoned() -> Self {
        Self::new("workflow run abandoned by orchestrator").with_code("ABANDONED")
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

/// A workflow is user-supplied code whose structure *is* the business
/// process. Unlike a declarative state machine, a workflow body is written
/// as ordinary sequential code: it suspends by calling
/// [`WorkflowContext::execute`], [`WorkflowContext::wait`], or
/// [`WorkflowContext::side_effect`], and resumes with the corresponding
/// result once the orchestrator has resolved that suspension (either from
/// history, or by doing the work live).
///
/// # Determinism
///
/// A workflow body must be a pure function of its constructor arguments and
/// the sequence of values it is resumed with. Given the same arguments and
/// the same resumed values in the same order, it must request the same
/// sequence of suspensions. This is what allows replay-based recovery.
///
/// # Example
///
/// ```ignore
/// use durable_engine::prelude::*;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct SignupArgs {
///     user: String,
/// }
///
/// struct SignupWorkflow {
///     args: SignupArgs,
/// }
///
/// impl Workflow for SignupWorkflow {
///     const TYPE: &'static str = "signup_workflow";
///     type Args = SignupArgs;
///
///     fn new(args: Self::Args) -> Self {
///         Self { args }
///     }
///
///     fn run(self, ctx: &WorkflowContext) -> Result<serde_json::Value, WorkflowError> {
///         let signup = ctx.execute(SignupActivity::new(&self.args.user))?;
///         ctx.wait("7 days")?;
///         let charge = ctx.execute(ChargeActivity::new(&self.args.user))?;
///         Ok(json!(format!("Done: {signup} -> {charge}")))
///     }
/// }
/// ```
pub trait Workflow: Send + 'static {
    /// Unique type identifier for this workflow.
    ///
    /// Used as the `class` name in the registry lookup during both the
    /// initial run and every subsequent replay.
    const TYPE: &'static str;

    /// Constructor argument type, deserialized from the stored `args`.
    type Args: DeserializeOwned + Send;

    /// Create a new workflow instance from its arguments.
    ///
    /// Called identically whether this is the first run or a replay.
    fn new(args: Self::Args) -> Self;

    /// Run the workflow body to completion or to its next suspension.
    ///
    /// This method owns `self` and runs on a dedicated coroutine thread
    /// driven by `ctx`; it returns only when the body itself returns (or
    /// raises). The orchestrator observes suspensions through `ctx`, not
    /// through this method's control flow.
    fn run(self, ctx: &WorkflowContext) -> Result<serde_json::Value, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_display() {
        let error = WorkflowError::new("something went wrong");
        assert_eq!(error.to_string(), "something went wrong");
    }

    #[test]
    fn test_workflow_error_with_code() {
        let error = WorkflowError::new("not found").with_code("NOT_FOUND");
        assert_eq!(error.code, Some("NOT_FOUND".to_string()));
    }
}
