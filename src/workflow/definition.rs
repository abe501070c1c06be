//! Workflow definition types

use std::{collections::HashSet, fmt, sync::Arc, time::Duration};

use super::{
    executor::StepExecutor,
    types::{FailureAction, StepId, WorkflowData, WorkflowId},
};

/// Errors that can occur during workflow validation
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Workflow '{0}' has no steps")]
    Empty(WorkflowId),

    #[error("Step id '{0}' is used more than once")]
    DuplicateStep(StepId),

    #[error("Unknown step '{0}'")]
    UnknownStep(StepId),
}

/// Definition of a single step within a workflow
pub struct StepDefinition<D: WorkflowData> {
    pub id: StepId,
    pub name: String,
    pub executor: Arc<dyn StepExecutor<D>>,
    pub on_failure: FailureAction,
}

impl<D: WorkflowData> fmt::Debug for StepDefinition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("on_failure", &self.on_failure)
            .finish_non_exhaustive()
    }
}

impl<D: WorkflowData> StepDefinition<D> {
    /// New steps are non-critical until marked otherwise.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        executor: Arc<dyn StepExecutor<D>>,
    ) -> Self {
        Self {
            id: StepId::new(id.into()),
            name: name.into(),
            executor,
            on_failure: FailureAction::ContinueNextStep,
        }
    }

    pub fn with_failure_action(mut self, action: FailureAction) -> Self {
        self.on_failure = action;
        self
    }

    pub fn critical(self) -> Self {
        self.with_failure_action(FailureAction::FailWorkflow)
    }

    pub fn is_critical(&self) -> bool {
        self.on_failure == FailureAction::FailWorkflow
    }
}

/// Complete workflow definition: an ordered step list plus pacing.
pub struct WorkflowDefinition<D: WorkflowData> {
    pub id: WorkflowId,
    pub name: String,
    pub steps: Vec<StepDefinition<D>>,
    /// Pause between consecutive steps
    pub step_delay: Duration,
    /// Upper bound on a single step execution
    pub step_timeout: Duration,
}

impl<D: WorkflowData> fmt::Debug for WorkflowDefinition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("step_delay", &self.step_delay)
            .field("step_timeout", &self.step_timeout)
            .finish()
    }
}

impl<D: WorkflowData> WorkflowDefinition<D> {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(id.into()),
            name: name.into(),
            steps: Vec::new(),
            step_delay: Duration::from_secs(1),
            step_timeout: Duration::from_secs(30),
        }
    }

    pub fn add_step(mut self, step: StepDefinition<D>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Replace the criticality of every step: the listed ids become
    /// `FailWorkflow`, all others `ContinueNextStep`.
    pub fn with_critical_steps(mut self, critical: &[StepId]) -> Result<Self, ValidationError> {
        for id in critical {
            if !self.steps.iter().any(|s| &s.id == id) {
                return Err(ValidationError::UnknownStep(id.clone()));
            }
        }
        for step in &mut self.steps {
            step.on_failure = if critical.contains(&step.id) {
                FailureAction::FailWorkflow
            } else {
                FailureAction::ContinueNextStep
            };
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use = "validation result should be checked"]
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.steps.is_empty() {
            return Err(ValidationError::Empty(self.id.clone()));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(&step.id) {
                return Err(ValidationError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::workflow::{
        executor::WorkflowContext,
        types::StepOutcome,
    };

    struct Noop;

    impl WorkflowData for () {
        fn workflow_type() -> &'static str {
            "unit"
        }
    }

    #[async_trait]
    impl StepExecutor<()> for Noop {
        async fn execute(&self, _context: &mut WorkflowContext<()>) -> StepOutcome {
            Ok(())
        }
    }

    fn two_steps() -> WorkflowDefinition<()> {
        WorkflowDefinition::new("wf", "Test")
            .add_step(StepDefinition::new("a", "A", Arc::new(Noop)).critical())
            .add_step(StepDefinition::new("b", "B", Arc::new(Noop)))
    }

    #[test]
    fn test_steps_default_to_non_critical() {
        let def = two_steps();
        assert!(def.steps[0].is_critical());
        assert!(!def.steps[1].is_critical());
    }

    #[test]
    fn test_with_critical_steps_replaces_flags() {
        let def = two_steps()
            .with_critical_steps(&[StepId::new("b")])
            .unwrap();
        assert!(!def.steps[0].is_critical());
        assert!(def.steps[1].is_critical());
    }

    #[test]
    fn test_with_critical_steps_rejects_unknown_id() {
        let err = two_steps()
            .with_critical_steps(&[StepId::new("missing")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownStep(_)));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        assert!(two_steps().validate().is_ok());

        let dup = two_steps().add_step(StepDefinition::new("a", "Again", Arc::new(Noop)));
        assert!(matches!(
            dup.validate(),
            Err(ValidationError::DuplicateStep(_))
        ));

        let empty: WorkflowDefinition<()> = WorkflowDefinition::new("empty", "Empty");
        assert!(matches!(empty.validate(), Err(ValidationError::Empty(_))));
    }
}
