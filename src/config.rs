use std::{path::PathBuf, time::Duration};

use crate::{
    activation::{default_critical_steps, ActivationPlan},
    auth::UserEntry,
    workflow::StepId,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the remote activation workflow
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    pub remote_base_url: String,
    /// Per-call HTTP timeout
    pub request_timeout: Duration,
    /// Pause between consecutive steps
    pub step_delay: Duration,
    pub critical_steps: Vec<StepId>,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            remote_base_url: "https://activation.example.invalid".to_string(),
            request_timeout: Duration::from_secs(10),
            step_delay: Duration::from_secs(1),
            critical_steps: default_critical_steps(),
        }
    }
}

impl ActivationConfig {
    /// Bound on a whole step: the HTTP timeout plus some slack for body handling
    pub fn step_timeout(&self) -> Duration {
        self.request_timeout + Duration::from_secs(5)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub activation: ActivationConfig,
    /// `None` keeps the identifier list in memory only
    pub store_path: Option<PathBuf>,
    pub session_timeout: Duration,
    pub users: Vec<UserEntry>,
    pub log_level: log::LevelFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            activation: ActivationConfig::default(),
            store_path: Some(PathBuf::from("radio_ids.json")),
            session_timeout: Duration::from_secs(30 * 60),
            users: Vec::new(),
            log_level: log::LevelFilter::Info,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let base = self.activation.remote_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "remote_base_url".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "remote_base_url".to_string(),
                value: base.to_string(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.activation.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "session_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let plan = ActivationPlan::canonical();
        if let Some(unknown) = self
            .activation
            .critical_steps
            .iter()
            .find(|id| !plan.contains(id.as_str()))
        {
            return Err(ConfigError::InvalidValue {
                field: "critical_step".to_string(),
                value: unknown.to_string(),
                reason: "not a step of the activation workflow".to_string(),
            });
        }

        if self.users.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "user".to_string(),
            });
        }
        Ok(())
    }
}
