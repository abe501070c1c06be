//! The canonical activation step chain
//!
//! Order and value threading follow the remote service's contract:
//! `login` yields the bearer token used by every later call and
//! `device_refresh_1` yields the sequence token consumed by `crm_info` and
//! `create_account`.

use std::{sync::Arc, time::Duration};

use super::{
    context::{ActivationContext, TokenSlot},
    request::{FieldSource, RequestTemplate, StepRequest},
    step::RemoteCallStep,
};
use crate::workflow::{StepDefinition, StepId, ValidationError, WorkflowDefinition};

pub const LOGIN: &str = "login";
pub const VERSION_CONTROL: &str = "version_control";
pub const GET_PROPERTIES: &str = "get_properties";
pub const DEVICE_REFRESH_1: &str = "device_refresh_1";
pub const CRM_INFO: &str = "crm_info";
pub const DB_UPDATE: &str = "db_update";
pub const BLOCKLIST: &str = "blocklist";
pub const ORACLE_LOOKUP: &str = "oracle_lookup";
pub const CREATE_ACCOUNT: &str = "create_account";
pub const DEVICE_REFRESH_2: &str = "device_refresh_2";

/// Critical by default: only authentication aborts a run.
pub const DEFAULT_CRITICAL_STEPS: &[&str] = &[LOGIN];

/// One entry of the plan
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub id: &'static str,
    pub name: &'static str,
    pub request: StepRequest,
}

/// Ordered list of remote calls making up one activation
#[derive(Debug, Clone)]
pub struct ActivationPlan {
    pub steps: Vec<PlannedStep>,
}

impl ActivationPlan {
    pub fn canonical() -> Self {
        use FieldSource::{ClientId, RadioId, SequenceToken};

        let steps = vec![
            PlannedStep {
                id: LOGIN,
                name: "Login",
                request: StepRequest::post("/auth/v1/login")
                    .field("clientId", ClientId)
                    .literal("grantType", "device")
                    .extract("/accessToken", TokenSlot::Bearer),
            },
            PlannedStep {
                id: VERSION_CONTROL,
                name: "Version control",
                request: StepRequest::get("/app/v1/version-control")
                    .literal("platform", "web")
                    .field("clientId", ClientId),
            },
            PlannedStep {
                id: GET_PROPERTIES,
                name: "Get properties",
                request: StepRequest::get("/app/v1/properties").field("deviceId", RadioId),
            },
            PlannedStep {
                id: DEVICE_REFRESH_1,
                name: "Device refresh 1",
                request: StepRequest::post("/device/v1/refresh")
                    .field("deviceId", RadioId)
                    .field("clientId", ClientId)
                    .extract("/seqValue", TokenSlot::Sequence),
            },
            PlannedStep {
                id: CRM_INFO,
                name: "CRM info",
                request: StepRequest::post("/crm/v1/info")
                    .field("deviceId", RadioId)
                    .field("seqValue", SequenceToken),
            },
            PlannedStep {
                id: DB_UPDATE,
                name: "Database update",
                request: StepRequest::post("/device/v1/db-update")
                    .field("deviceId", RadioId)
                    .literal("status", "ACTIVE"),
            },
            PlannedStep {
                id: BLOCKLIST,
                name: "Blocklist check",
                request: StepRequest::post("/device/v1/blocklist").field("deviceId", RadioId),
            },
            PlannedStep {
                id: ORACLE_LOOKUP,
                name: "Oracle dealer lookup",
                request: StepRequest::post("/dealer/v1/oracle-lookup").field("deviceId", RadioId),
            },
            PlannedStep {
                id: CREATE_ACCOUNT,
                name: "Create account",
                request: StepRequest::post("/account/v1/create")
                    .field("deviceId", RadioId)
                    .field("clientId", ClientId)
                    .field("seqValue", SequenceToken),
            },
            PlannedStep {
                id: DEVICE_REFRESH_2,
                name: "Device refresh 2",
                request: StepRequest::post("/device/v1/refresh")
                    .field("deviceId", RadioId)
                    .field("clientId", ClientId),
            },
        ];
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.iter().any(|s| s.id == id)
    }

    /// Turn the plan into an executable workflow definition
    pub fn into_workflow(
        self,
        template: RequestTemplate,
        step_delay: Duration,
        step_timeout: Duration,
        critical_steps: &[StepId],
    ) -> Result<WorkflowDefinition<ActivationContext>, ValidationError> {
        let template = Arc::new(template);
        let definition = self.steps.into_iter().fold(
            WorkflowDefinition::new("device_activation", "Device activation")
                .with_step_delay(step_delay)
                .with_step_timeout(step_timeout),
            |def, planned| {
                let executor = RemoteCallStep::new(
                    StepId::new(planned.id),
                    planned.request,
                    Arc::clone(&template),
                );
                def.add_step(StepDefinition::new(
                    planned.id,
                    planned.name,
                    Arc::new(executor),
                ))
            },
        );
        definition.with_critical_steps(critical_steps)
    }
}

pub fn default_critical_steps() -> Vec<StepId> {
    DEFAULT_CRITICAL_STEPS.iter().map(|s| StepId::new(*s)).collect()
}
