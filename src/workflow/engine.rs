//! Sequential workflow execution engine
//!
//! Runs the steps of a [`WorkflowDefinition`] strictly in order. A failed
//! critical step (`FailureAction::FailWorkflow`) aborts the run; any other
//! failure is recorded and the run moves on. Between steps the engine waits
//! `step_delay` and checks for cancellation.

use std::{sync::Arc, time::Instant};

use log::{debug, error, info, warn};
use tokio::time::timeout;

use super::{
    cancel::CancelSignal,
    definition::{StepDefinition, ValidationError, WorkflowDefinition},
    executor::WorkflowContext,
    progress::RunProgress,
    types::{
        FailureAction, RunId, RunReport, StepId, WorkflowData, WorkflowStatus,
    },
};

/// Outcome of a single step as seen by the loop
enum StepVerdict {
    Passed,
    Failed(String),
}

pub struct WorkflowEngine<D: WorkflowData> {
    definition: Arc<WorkflowDefinition<D>>,
}

impl<D: WorkflowData> Clone for WorkflowEngine<D> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<D: WorkflowData> std::fmt::Debug for WorkflowEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("definition", &self.definition.id)
            .field("steps", &self.definition.len())
            .finish()
    }
}

impl<D: WorkflowData> WorkflowEngine<D> {
    /// Build an engine after validating the definition
    pub fn new(definition: WorkflowDefinition<D>) -> Result<Self, ValidationError> {
        definition.validate()?;
        Ok(Self {
            definition: Arc::new(definition),
        })
    }

    pub fn step_count(&self) -> usize {
        self.definition.len()
    }

    /// Execute every step in order against `data`.
    ///
    /// Errors never escape: they are folded into `progress` and the returned
    /// report. `progress` is always left with `completed = true`.
    pub async fn run(
        &self,
        data: D,
        progress: &RunProgress,
        mut cancel: CancelSignal,
    ) -> RunReport {
        let run_id = RunId::new();
        let definition = &self.definition;
        let total = definition.len();
        let started = Instant::now();
        let mut context = WorkflowContext::new(run_id, data);
        let mut failed_steps = Vec::new();
        let mut steps_run = 0;

        info!(
            "[{}] Workflow {} started ({} steps, type {})",
            run_id,
            definition.id,
            total,
            D::workflow_type()
        );

        for (idx, step) in definition.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled(run_id, progress, steps_run, failed_steps);
            }

            let number = idx + 1;
            progress.append_status(format!("Step {}/{}: {}", number, total, step.name));
            progress.set_progress(number);
            steps_run += 1;

            match self.execute_step(step, &mut context).await {
                StepVerdict::Passed => {
                    debug!("[{}] Step {} succeeded", run_id, step.id);
                    progress.append_status(format!("{} succeeded", step.name));
                }
                StepVerdict::Failed(reason) => {
                    failed_steps.push(step.id.clone());
                    progress.append_status(format!("{} failed: {}", step.name, reason));
                    match step.on_failure {
                        FailureAction::FailWorkflow => {
                            error!(
                                "[{}] Critical step {} failed, aborting: {}",
                                run_id, step.id, reason
                            );
                            progress.append_status(format!(
                                "Critical step {} failed, aborting",
                                step.name
                            ));
                            progress.finish(false);
                            return RunReport {
                                run_id,
                                status: WorkflowStatus::Failed,
                                steps_run,
                                failed_steps,
                            };
                        }
                        FailureAction::ContinueNextStep => {
                            warn!("[{}] Step {} failed, continuing: {}", run_id, step.id, reason);
                        }
                    }
                }
            }

            if number < total && !definition.step_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(definition.step_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        // reaching the end is success; non-critical failures only show in the log
        let status = WorkflowStatus::Completed;
        if failed_steps.is_empty() {
            progress.append_status(format!("All {} steps completed successfully", total));
        } else {
            progress.append_status(format!(
                "Completed {} steps with {} failed step(s)",
                total,
                failed_steps.len()
            ));
        }
        progress.finish(true);

        info!(
            "[{}] Workflow {} finished: {:?} in {} ms",
            run_id,
            definition.id,
            status,
            started.elapsed().as_millis()
        );

        RunReport {
            run_id,
            status,
            steps_run,
            failed_steps,
        }
    }

    async fn execute_step(
        &self,
        step: &StepDefinition<D>,
        context: &mut WorkflowContext<D>,
    ) -> StepVerdict {
        let step_timeout = self.definition.step_timeout;
        match timeout(step_timeout, step.executor.execute(context)).await {
            Ok(Ok(())) => StepVerdict::Passed,
            Ok(Err(e)) => StepVerdict::Failed(e.to_string()),
            Err(_) => StepVerdict::Failed(format!("timed out after {:?}", step_timeout)),
        }
    }

    fn cancelled(
        &self,
        run_id: RunId,
        progress: &RunProgress,
        steps_run: usize,
        failed_steps: Vec<StepId>,
    ) -> RunReport {
        info!("[{}] Workflow {} cancelled", run_id, self.definition.id);
        progress.append_status("Run cancelled");
        progress.finish(false);
        RunReport {
            run_id,
            status: WorkflowStatus::Cancelled,
            steps_run,
            failed_steps,
        }
    }
}
