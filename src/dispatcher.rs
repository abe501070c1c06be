//! Accepts activation requests and runs them one at a time.
//!
//! Only the latest run is tracked. Accepting a new request cancels the
//! previous run, installs a fresh progress record in the slot and spawns a
//! worker; the handler returns without waiting for the worker.

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    activation::{
        normalize_radio_id, ActivationContext, ActivationPlan, HttpRemoteApi, RemoteApi,
        RequestTemplate,
    },
    config::ActivationConfig,
    workflow::{
        cancel_pair, CancelHandle, ProgressRecord, ProgressSlot, ValidationError, WorkflowEngine,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("radio_id is required")]
    MissingRadioId,
}

/// Acknowledgement returned to the caller of `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub accepted: bool,
    pub radio_id: String,
}

struct ActiveRun {
    radio_id: String,
    cancel: CancelHandle,
}

pub struct ActivationDispatcher {
    engine: WorkflowEngine<ActivationContext>,
    remote: Arc<dyn RemoteApi>,
    slot: ProgressSlot,
    active: Mutex<Option<ActiveRun>>,
}

impl std::fmt::Debug for ActivationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationDispatcher")
            .field("engine", &self.engine)
            .field("active", &self.current_radio_id())
            .finish()
    }
}

impl ActivationDispatcher {
    pub fn new(engine: WorkflowEngine<ActivationContext>, remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            engine,
            remote,
            slot: ProgressSlot::new(),
            active: Mutex::new(None),
        }
    }

    /// Dispatcher over the canonical plan talking HTTP to the configured API
    pub fn from_config(config: &ActivationConfig) -> Result<Self, ValidationError> {
        let definition = ActivationPlan::canonical().into_workflow(
            RequestTemplate::default(),
            config.step_delay,
            config.step_timeout(),
            &config.critical_steps,
        )?;
        let remote = HttpRemoteApi::new(config.remote_base_url.clone(), config.request_timeout);
        Ok(Self::new(WorkflowEngine::new(definition)?, Arc::new(remote)))
    }

    /// Accept an activation request and launch its worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, raw_radio_id: &str) -> Result<Accepted, DispatchError> {
        let radio_id = normalize_radio_id(raw_radio_id);
        if radio_id.is_empty() {
            return Err(DispatchError::MissingRadioId);
        }

        let (cancel, signal) = cancel_pair();
        let progress = {
            let mut active = self.active.lock();
            if let Some(previous) = active.take() {
                warn!(
                    "Superseding activation of {} with {}",
                    previous.radio_id, radio_id
                );
                previous.cancel.cancel();
            }
            let progress = self.slot.reset();
            *active = Some(ActiveRun {
                radio_id: radio_id.clone(),
                cancel,
            });
            progress
        };
        info!("Activation accepted for {}", radio_id);

        let engine = self.engine.clone();
        let remote = Arc::clone(&self.remote);
        let run_radio_id = radio_id.clone();
        tokio::spawn(async move {
            progress.append_status(format!("Starting activation for {}", run_radio_id));
            let session = match remote.open_session() {
                Ok(session) => session,
                Err(e) => {
                    error!("Could not open remote session for {}: {}", run_radio_id, e);
                    progress.append_status(format!("Could not open remote session: {}", e));
                    progress.finish(false);
                    return;
                }
            };
            let context = ActivationContext::new(&run_radio_id, session);

            let worker = {
                let progress = Arc::clone(&progress);
                tokio::spawn(async move { engine.run(context, &progress, signal).await })
            };
            match worker.await {
                Ok(report) => info!(
                    "Activation of {} finished: {:?}, {} step(s) run, failed: {:?}",
                    run_radio_id, report.status, report.steps_run, report.failed_steps
                ),
                Err(e) => {
                    error!("Activation worker for {} crashed: {}", run_radio_id, e);
                    progress.append_status("Activation worker stopped unexpectedly");
                    progress.finish(false);
                }
            }
        });

        Ok(Accepted {
            accepted: true,
            radio_id,
        })
    }

    /// Snapshot of the latest run's progress
    pub fn status(&self) -> ProgressRecord {
        self.slot.read()
    }

    pub fn current_radio_id(&self) -> Option<String> {
        self.active.lock().as_ref().map(|run| run.radio_id.clone())
    }

    pub fn step_count(&self) -> usize {
        self.engine.step_count()
    }

    /// Ask the in-flight run, if any, to stop before its next step
    pub fn cancel_active(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(run) if !run.cancel.is_cancelled() => {
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}
