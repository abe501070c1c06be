//! Device activation workflow against the remote activation API

mod context;
pub mod plan;
mod remote;
mod request;
mod step;

pub use context::{normalize_radio_id, ActivationContext, TokenSlot};
pub use plan::{default_critical_steps, ActivationPlan, PlannedStep};
pub use remote::{
    HttpRemoteApi, HttpRemoteSession, RemoteApi, RemoteError, RemoteRequest, RemoteSession,
};
pub use request::{
    Extraction, FieldSource, RequestTemplate, StepRequest, CLIENT_ID_HEADER, DEVICE_ID_HEADER,
};
pub use step::RemoteCallStep;
