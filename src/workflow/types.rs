//! Core workflow types

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait for per-run data threaded through workflow steps.
///
/// The data is owned by a single run and mutated in place by each step;
/// it is never shared between runs.
pub trait WorkflowData: Send + Sync + 'static {
    /// Human-readable name for logging and identification
    fn workflow_type() -> &'static str;
}

/// Unique identifier for a workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a workflow step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Action to take when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureAction {
    /// Stop the entire workflow (critical step)
    FailWorkflow,
    /// Log the failure and continue to the next step
    ContinueNextStep,
}

/// Terminal state of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowStatus::Completed)
    }
}

/// Error kinds raised while executing a step
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Context value not found: {0}")]
    ContextValueNotFound(String),
}

pub type StepOutcome = Result<(), StepError>;

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: WorkflowStatus,
    /// Number of steps that were invoked
    pub steps_run: usize,
    /// Steps that failed, in execution order
    pub failed_steps: Vec<StepId>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}
