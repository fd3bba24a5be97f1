//! Activity trait definition

use serde::{Deserialize, Serialize};

/// Error type for activity failures.
///
/// There are no retry semantics here: a failing activity always terminates
/// the workflow that invoked it. Retries, if wanted, are the caller's
/// responsibility inside `handle()` itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,

    /// Additional error details (for debugging)
    pub details: Option<serde_json::Value>,
}

impl ActivityError {
    /// Create a new activity error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            details: None,
        }
    }

    /// Set the error type.
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

impl From<anyhow::Error> for ActivityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// An activity is a single opaque operation invoked by the engine on behalf
/// of a workflow body.
///
/// Activities are black boxes: the engine does not know or care what they
/// do, only that `handle()` runs synchronously, returns a JSON-serializable
/// value on success, and is invoked at most once per successful completion
/// across all replays of its parent workflow.
///
/// # Example
///
/// ```ignore
/// use durable_engine::prelude::*;
///
/// struct SignupActivity {
///     user: String,
/// }
///
/// impl Activity for SignupActivity {
///     fn handle(&self) -> Result<serde_json::Value, ActivityError> {
///         Ok(serde_json::json!(format!("Processed: {}", self.user)))
///     }
/// }
/// ```
pub trait Activity: Send + 'static {
    /// Perform the operation and return its JSON-serializable result.
    fn handle(&self) -> Result<serde_json::Value, ActivityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_error_display() {
        let error = ActivityError::new("timeout");
        assert_eq!(error.to_string(), "timeout");
    }

    #[test]
    fn test_activity_error_with_type() {
        let error = ActivityError::new("connection failed").with_type("CONNECTION_ERROR");
        assert_eq!(error.error_type, Some("CONNECTION_ERROR".to_string()));
    }

    #[test]
    fn test_activity_error_serialization() {
        let error = ActivityError::new("test error")
            .with_type("TEST")
            .with_details(serde_json::json!({"key": "value"}));

        let json = serde_json::to_string(&error).unwrap();
        let parsed: ActivityError = serde_json::from_str(&json).unwrap();

        assert_eq!(error, parsed);
    }

    struct EchoActivity(serde_json::Value);

    impl Activity for EchoActivity {
        fn handle(&self) -> Result<serde_json::Value, ActivityError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_activity_handle_returns_value() {
        let activity = EchoActivity(serde_json::json!({"ok": true}));
        assert_eq!(activity.handle().unwrap(), serde_json::json!({"ok": true}));
    }
}
