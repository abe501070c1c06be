//! Sequential workflow engine for multi-step remote operations

mod cancel;
mod definition;
mod engine;
mod executor;
mod progress;
pub mod types;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use definition::{StepDefinition, ValidationError, WorkflowDefinition};
pub use engine::WorkflowEngine;
pub use executor::{StepExecutor, WorkflowContext};
pub use progress::{ProgressRecord, ProgressSlot, RunProgress, READY_STATUS};
pub use types::*;
