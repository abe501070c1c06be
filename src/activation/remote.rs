//! Transport to the remote activation API

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

/// One fully-built call to the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// Sent as the query string for GET, as a urlencoded body otherwise
    pub form: Vec<(String, String)>,
}

impl RemoteRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Request(e.to_string())
        }
    }
}

/// A call session: cookie and connection state shared by the calls of one run.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError>;
}

/// Factory for call sessions; one session is opened per run.
pub trait RemoteApi: Send + Sync {
    fn open_session(&self) -> Result<Arc<dyn RemoteSession>, RemoteError>;
}

/// `reqwest`-backed remote API
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    timeout: Duration,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RemoteApi for HttpRemoteApi {
    fn open_session(&self) -> Result<Arc<dyn RemoteSession>, RemoteError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()?;
        Ok(Arc::new(HttpRemoteSession {
            client,
            base_url: self.base_url.clone(),
        }))
    }
}

pub struct HttpRemoteSession {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteSession {
    fn api_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl RemoteSession for HttpRemoteSession {
    async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
        let url = self.api_path(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = if request.method == Method::GET {
            builder.query(&request.form)
        } else {
            builder.form(&request.form)
        };

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_body(&body)
    }
}

/// Empty bodies parse as `null`; anything else must be JSON.
pub(crate) fn parse_body(body: &str) -> Result<Value, RemoteError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| RemoteError::MalformedBody(e.to_string()))
}
