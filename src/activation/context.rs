//! Per-run activation state

use std::{fmt, sync::Arc};

use rand::Rng;

use super::remote::RemoteSession;
use crate::workflow::WorkflowData;

/// Trim and uppercase a radio identifier. No further validation is done;
/// the remote service decides whether the identifier is valid.
pub fn normalize_radio_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Random client instance id, stable for one run
fn generate_client_id() -> String {
    let value: u128 = rand::rng().random();
    format!("{:032x}", value)
}

/// Which run-state slot an extracted value is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    Bearer,
    Sequence,
}

/// State threaded through the activation steps of one run.
pub struct ActivationContext {
    pub radio_id: String,
    pub client_id: String,
    pub bearer_token: Option<String>,
    pub sequence_token: Option<String>,
    /// Cookie-carrying call session, fresh for every run
    pub session: Arc<dyn RemoteSession>,
}

impl ActivationContext {
    pub fn new(radio_id: &str, session: Arc<dyn RemoteSession>) -> Self {
        Self {
            radio_id: normalize_radio_id(radio_id),
            client_id: generate_client_id(),
            bearer_token: None,
            sequence_token: None,
            session,
        }
    }

    pub fn token(&self, slot: TokenSlot) -> Option<&str> {
        match slot {
            TokenSlot::Bearer => self.bearer_token.as_deref(),
            TokenSlot::Sequence => self.sequence_token.as_deref(),
        }
    }

    pub fn store_token(&mut self, slot: TokenSlot, value: String) {
        match slot {
            TokenSlot::Bearer => self.bearer_token = Some(value),
            TokenSlot::Sequence => self.sequence_token = Some(value),
        }
    }
}

impl fmt::Debug for ActivationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationContext")
            .field("radio_id", &self.radio_id)
            .field("client_id", &self.client_id)
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("has_sequence_token", &self.sequence_token.is_some())
            .finish_non_exhaustive()
    }
}

impl WorkflowData for ActivationContext {
    fn workflow_type() -> &'static str {
        "device_activation"
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::activation::remote::{RemoteError, RemoteRequest};

    struct NullSession;

    #[async_trait]
    impl RemoteSession for NullSession {
        async fn send(&self, _request: RemoteRequest) -> Result<serde_json::Value, RemoteError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_normalize_radio_id() {
        assert_eq!(normalize_radio_id("h55eu0r5"), "H55EU0R5");
        assert_eq!(normalize_radio_id("  abc12345\n"), "ABC12345");
        assert_eq!(normalize_radio_id("not-valid!"), "NOT-VALID!");
    }

    #[test]
    fn test_context_starts_without_tokens() {
        let ctx = ActivationContext::new("h55eu0r5", Arc::new(NullSession));
        assert_eq!(ctx.radio_id, "H55EU0R5");
        assert_eq!(ctx.client_id.len(), 32);
        assert!(ctx.token(TokenSlot::Bearer).is_none());
        assert!(ctx.token(TokenSlot::Sequence).is_none());
    }

    #[test]
    fn test_client_id_differs_per_run() {
        let a = ActivationContext::new("X", Arc::new(NullSession));
        let b = ActivationContext::new("X", Arc::new(NullSession));
        assert_ne!(a.client_id, b.client_id);
    }

    #[test]
    fn test_store_token() {
        let mut ctx = ActivationContext::new("X", Arc::new(NullSession));
        ctx.store_token(TokenSlot::Bearer, "abc".to_string());
        ctx.store_token(TokenSlot::Sequence, "42".to_string());
        assert_eq!(ctx.token(TokenSlot::Bearer), Some("abc"));
        assert_eq!(ctx.token(TokenSlot::Sequence), Some("42"));
    }
}
