use std::{path::PathBuf, time::Duration};

use actix_web::web;
use clap::{ArgAction, Parser};
use device_activator::{
    activation::default_critical_steps,
    auth::UserEntry,
    config::{ActivationConfig, ServerConfig},
    logging,
    server::{self, AppState},
    workflow::StepId,
};
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "device-activator")]
#[command(about = "Device activation service - drives the remote activation workflow")]
#[command(long_about = r#"
Device activation service

Runs the remote device-activation step chain for one radio identifier at a
time, reports progress to polling clients and keeps the list of known radio
identifiers.

Examples:
  device-activator --remote-base-url https://activation.example.com \
    --user admin:changeme:admin --user desk:desk123:operator

  # Treat login and the first device refresh as critical
  device-activator --remote-base-url https://activation.example.com \
    --user admin:changeme:admin \
    --critical-step login --critical-step device_refresh_1
"#)]
struct CliArgs {
    /// Host address to bind the server
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Base URL of the remote activation API
    #[arg(long, default_value = "https://activation.example.invalid")]
    remote_base_url: String,

    /// Timeout in seconds for each remote call
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Pause in milliseconds between workflow steps
    #[arg(long, default_value_t = 1000)]
    step_delay_ms: u64,

    /// Step whose failure aborts the run (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    critical_step: Vec<String>,

    /// JSON file holding the radio identifier list
    #[arg(long, default_value = "radio_ids.json")]
    store_path: PathBuf,

    /// Keep the radio identifier list in memory only
    #[arg(long, default_value_t = false)]
    in_memory_store: bool,

    /// Seconds before a login session expires
    #[arg(long, default_value_t = 1800)]
    session_timeout_secs: u64,

    /// Account as <name>:<password>:<role>, role is admin or operator
    #[arg(long, action = ArgAction::Append)]
    user: Vec<UserEntry>,

    /// Log level
    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,
}

impl CliArgs {
    fn to_server_config(&self) -> ServerConfig {
        let critical_steps = if self.critical_step.is_empty() {
            default_critical_steps()
        } else {
            self.critical_step.iter().map(StepId::new).collect()
        };

        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            activation: ActivationConfig {
                remote_base_url: self.remote_base_url.clone(),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                step_delay: Duration::from_millis(self.step_delay_ms),
                critical_steps,
            },
            store_path: (!self.in_memory_store).then(|| self.store_path.clone()),
            session_timeout: Duration::from_secs(self.session_timeout_secs),
            users: self.user.clone(),
            log_level: self.log_level.parse().unwrap_or(log::LevelFilter::Info),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();
    let server_config = cli_args.to_server_config();
    server_config.validate()?;

    logging::init_logging(server_config.log_level);

    let app_state = web::Data::new(AppState::from_config(&server_config)?);

    actix_web::rt::System::new().block_on(async move {
        actix_web::rt::spawn(server::session_janitor(app_state.clone()));
        tokio::select! {
            res = server::startup(server_config, app_state.clone()) => {
                res?;
            }
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down");
            }
        }
        if app_state.dispatcher.cancel_active() {
            log::info!("Cancelled in-flight activation");
        }
        Ok::<(), anyhow::Error>(())
    })
}
