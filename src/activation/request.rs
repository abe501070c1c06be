//! Request construction shared by every activation step
//!
//! The common header set lives in [`RequestTemplate`]; each step only
//! supplies a [`StepRequest`] with its path, method, form fields and the value
//! it extracts from the response.

use log::warn;
use reqwest::Method;
use serde_json::Value;

use super::{
    context::{ActivationContext, TokenSlot},
    remote::RemoteRequest,
};

pub const CLIENT_ID_HEADER: &str = "X-Client-Id";
pub const DEVICE_ID_HEADER: &str = "X-Device-Id";

/// Where a form field's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Literal(String),
    RadioId,
    ClientId,
    SequenceToken,
}

/// A value to pull out of a step's JSON response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// JSON pointer into the response body, e.g. `/accessToken`
    pub pointer: String,
    pub slot: TokenSlot,
}

impl Extraction {
    pub fn new(pointer: impl Into<String>, slot: TokenSlot) -> Self {
        Self {
            pointer: pointer.into(),
            slot,
        }
    }

    /// Look the value up in `body`. Null, false, empty strings and missing
    /// keys all count as "nothing extracted".
    pub fn extract(&self, body: &Value) -> Option<String> {
        match body.pointer(&self.pointer)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }
}

/// Per-step override of the shared template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub method: Method,
    pub path: String,
    pub form: Vec<(String, FieldSource)>,
    pub extract: Option<Extraction>,
}

impl StepRequest {
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            form: Vec::new(),
            extract: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            ..Self::post(path)
        }
    }

    pub fn field(mut self, name: impl Into<String>, source: FieldSource) -> Self {
        self.form.push((name.into(), source));
        self
    }

    pub fn literal(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, FieldSource::Literal(value.into()))
    }

    pub fn extract(mut self, pointer: impl Into<String>, slot: TokenSlot) -> Self {
        self.extract = Some(Extraction::new(pointer, slot));
        self
    }

    pub fn uses_sequence_token(&self) -> bool {
        self.form
            .iter()
            .any(|(_, source)| *source == FieldSource::SequenceToken)
    }
}

/// Headers sent with every call
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub user_agent: String,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            user_agent: concat!("device-activator/", env!("CARGO_PKG_VERSION")).to_string(),
            extra_headers: vec![("Accept".to_string(), "application/json".to_string())],
        }
    }
}

impl RequestTemplate {
    pub fn build(&self, step: &StepRequest, ctx: &ActivationContext) -> RemoteRequest {
        let mut headers = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            (CLIENT_ID_HEADER.to_string(), ctx.client_id.clone()),
            (DEVICE_ID_HEADER.to_string(), ctx.radio_id.clone()),
        ];
        headers.extend(self.extra_headers.iter().cloned());
        // omitted until login has produced a token
        if let Some(token) = &ctx.bearer_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let form = step
            .form
            .iter()
            .map(|(name, source)| (name.clone(), resolve(source, ctx, &step.path)))
            .collect();

        RemoteRequest {
            method: step.method.clone(),
            path: step.path.clone(),
            headers,
            form,
        }
    }
}

fn resolve(source: &FieldSource, ctx: &ActivationContext, path: &str) -> String {
    match source {
        FieldSource::Literal(value) => value.clone(),
        FieldSource::RadioId => ctx.radio_id.clone(),
        FieldSource::ClientId => ctx.client_id.clone(),
        FieldSource::SequenceToken => match &ctx.sequence_token {
            Some(token) => token.clone(),
            None => {
                warn!("No sequence token available for {}", path);
                String::new()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::activation::remote::{RemoteError, RemoteSession};

    struct NullSession;

    #[async_trait]
    impl RemoteSession for NullSession {
        async fn send(&self, _request: RemoteRequest) -> Result<Value, RemoteError> {
            Ok(Value::Null)
        }
    }

    fn ctx() -> ActivationContext {
        ActivationContext::new("h55eu0r5", Arc::new(NullSession))
    }

    #[test]
    fn test_extraction_truthiness() {
        let ex = Extraction::new("/data/token", TokenSlot::Bearer);
        assert_eq!(
            ex.extract(&json!({"data": {"token": "abc"}})),
            Some("abc".to_string())
        );
        assert_eq!(ex.extract(&json!({"data": {"token": 17}})), Some("17".to_string()));
        assert_eq!(ex.extract(&json!({"data": {"token": ""}})), None);
        assert_eq!(ex.extract(&json!({"data": {"token": null}})), None);
        assert_eq!(ex.extract(&json!({"data": {}})), None);
        assert_eq!(ex.extract(&Value::Null), None);
    }

    #[test]
    fn test_build_without_token_omits_authorization() {
        let template = RequestTemplate::default();
        let req = template.build(&StepRequest::post("/login"), &ctx());
        assert!(req.header("Authorization").is_none());
        assert_eq!(req.header(DEVICE_ID_HEADER), Some("H55EU0R5"));
        assert_eq!(req.header(CLIENT_ID_HEADER).map(str::len), Some(32));
    }

    #[test]
    fn test_build_resolves_fields_and_token() {
        let template = RequestTemplate::default();
        let mut ctx = ctx();
        ctx.store_token(TokenSlot::Bearer, "tok".to_string());
        ctx.store_token(TokenSlot::Sequence, "seq-9".to_string());
        let step = StepRequest::post("/crm")
            .field("deviceId", FieldSource::RadioId)
            .field("clientId", FieldSource::ClientId)
            .field("seqValue", FieldSource::SequenceToken)
            .literal("channel", "web");

        let req = template.build(&step, &ctx);

        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
        assert_eq!(req.field("deviceId"), Some("H55EU0R5"));
        assert_eq!(req.field("clientId"), Some(ctx.client_id.as_str()));
        assert_eq!(req.field("seqValue"), Some("seq-9"));
        assert_eq!(req.field("channel"), Some("web"));
        assert!(step.uses_sequence_token());
    }

    #[test]
    fn test_missing_sequence_token_sends_empty_field() {
        let step = StepRequest::post("/crm").field("seqValue", FieldSource::SequenceToken);
        let req = RequestTemplate::default().build(&step, &ctx());
        assert_eq!(req.field("seqValue"), Some(""));
    }
}
