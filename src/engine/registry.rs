//! Workflow registry for type-erased workflow creation
//!
//! The registry maps a `class` name to a factory that, given deserialized
//! args and a [`WorkflowContext`], drives a concrete [`Workflow`]
//! implementation to completion. This is the only place in the engine that
//! needs to know a workflow's concrete Rust type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::workflow::{Workflow, WorkflowContext, WorkflowError};

/// Factory function type: deserialize args, construct the workflow, and
/// run it to completion or suspension.
type WorkflowFactory =
    Arc<dyn Fn(Value, &WorkflowContext) -> Result<Value, WorkflowError> + Send + Sync>;

/// Registry of workflow factories, keyed by [`Workflow::TYPE`].
///
/// Callers register every workflow type they want the orchestrator to be
/// able to run before calling `run()` for the first time.
///
/// # Example
///
/// ```ignore
/// let mut registry = WorkflowRegistry::new();
/// registry.register::<SignupWorkflow>();
/// ```
pub struct WorkflowRegistry {
    factories: HashMap<String, WorkflowFactory>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a workflow type under its [`Workflow::TYPE`] name.
    pub fn register<W: Workflow>(&mut self) {
        let factory: WorkflowFactory = Arc::new(|args: Value, ctx: &WorkflowContext| {
            let typed: W::Args = serde_json::from_value(args)
                .map_err(|e| WorkflowError::new(format!("invalid workflow args: {e}")))?;
            W::new(typed).run(ctx)
        });

        self.factories.insert(W::TYPE.to_string(), factory);
    }

    /// Register a bare factory function under `class`, bypassing the
    /// [`Workflow`] trait.
    ///
    /// Useful in tests that need to capture state (counters, shared
    /// handles) in the factory closure itself rather than threading it
    /// through deserialized `args`.
    pub fn register_fn<F>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn(Value, &WorkflowContext) -> Result<Value, WorkflowError> + Send + Sync + 'static,
    {
        self.factories.insert(class.into(), Arc::new(factory));
    }

    /// Check whether a class name is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Look up the factory for a class name.
    pub(crate) fn get(&self, class: &str) -> Option<WorkflowFactory> {
        self.factories.get(class).cloned()
    }

    /// Number of registered workflow types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no workflow types are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// All registered class names.
    pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflow_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct GreetArgs {
        name: String,
    }

    struct GreetWorkflow {
        args: GreetArgs,
    }

    impl Workflow for GreetWorkflow {
        const TYPE: &'static str = "greet_workflow";
        type Args = GreetArgs;

        fn new(args: Self::Args) -> Self {
            Self { args }
        }

        fn run(self, _ctx: &WorkflowContext) -> Result<Value, WorkflowError> {
            Ok(json!(format!("hello, {}", self.args.name)))
        }
    }

    #[test]
    fn test_register_and_contains() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<GreetWorkflow>();

        assert!(registry.contains("greet_workflow"));
        assert!(!registry.contains("unknown"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_workflow_types_iterator() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<GreetWorkflow>();

        let types: Vec<_> = registry.workflow_types().collect();
        assert_eq!(types, vec!["greet_workflow"]);
    }

    #[test]
    fn test_registry_debug() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<GreetWorkflow>();

        let debug_str = format!("{:?}", registry);
        assert!(debug_str.contains("greet_workflow"));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let registry = WorkflowRegistry::new();
        assert!(registry.get("unknown").is_none());
    }
}
