//! Step executor trait and the per-run context

use async_trait::async_trait;

use super::types::{RunId, StepOutcome, WorkflowData};

/// Context handed to every step of one run.
#[derive(Debug)]
pub struct WorkflowContext<D: WorkflowData> {
    pub run_id: RunId,
    pub data: D,
}

impl<D: WorkflowData> WorkflowContext<D> {
    pub fn new(run_id: RunId, data: D) -> Self {
        Self { run_id, data }
    }
}

/// Trait for executing individual workflow steps
#[async_trait]
pub trait StepExecutor<D: WorkflowData>: Send + Sync {
    /// Execute the step with the given context.
    ///
    /// An `Err` marks the step as failed.
    async fn execute(&self, context: &mut WorkflowContext<D>) -> StepOutcome;
}
