pub mod activation;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod server;
pub mod store;
pub mod workflow;
