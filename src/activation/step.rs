//! Workflow step that performs one remote activation call

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{
    context::ActivationContext,
    request::{RequestTemplate, StepRequest},
};
use crate::workflow::{StepError, StepExecutor, StepId, StepOutcome, WorkflowContext};

/// Executes one remote call and threads its extracted value into the run.
pub struct RemoteCallStep {
    id: StepId,
    request: StepRequest,
    template: Arc<RequestTemplate>,
}

impl RemoteCallStep {
    pub fn new(id: StepId, request: StepRequest, template: Arc<RequestTemplate>) -> Self {
        Self {
            id,
            request,
            template,
        }
    }
}

#[async_trait]
impl StepExecutor<ActivationContext> for RemoteCallStep {
    async fn execute(&self, context: &mut WorkflowContext<ActivationContext>) -> StepOutcome {
        let ctx = &context.data;
        let request = self.template.build(&self.request, ctx);
        let body = ctx
            .session
            .send(request)
            .await
            .map_err(|e| StepError::Remote(e.to_string()))?;

        let Some(extraction) = &self.request.extract else {
            return Ok(());
        };
        match extraction.extract(&body) {
            Some(value) => {
                debug!(
                    "[{}] {} extracted {:?} value",
                    context.run_id, self.id, extraction.slot
                );
                context.data.store_token(extraction.slot, value);
                Ok(())
            }
            None => Err(StepError::ContextValueNotFound(format!(
                "{} missing in {} response",
                extraction.pointer, self.id
            ))),
        }
    }
}
