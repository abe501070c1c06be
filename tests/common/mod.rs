// Shared helpers for integration tests
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use device_activator::{
    activation::{
        ActivationContext, ActivationPlan, RemoteApi, RemoteError, RemoteRequest, RemoteSession,
        RequestTemplate,
    },
    workflow::{ProgressRecord, StepId, WorkflowEngine},
};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const ACCESS_TOKEN: &str = "tok-123";
pub const SEQ_VALUE: &str = "seq-77";

#[derive(Clone)]
pub enum MockReply {
    Json(Value),
    Fail(RemoteError),
}

struct MockInner {
    calls: Mutex<Vec<RemoteRequest>>,
    replies: Mutex<HashMap<String, MockReply>>,
    sessions_opened: AtomicUsize,
    fail_open: bool,
    delay: Duration,
}

/// Scripted stand-in for the remote activation API. Records every request.
#[derive(Clone)]
pub struct MockRemote {
    inner: Arc<MockInner>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every call sleeps `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self::build(delay, false)
    }

    /// `open_session` always fails
    pub fn unreachable() -> Self {
        Self::build(Duration::ZERO, true)
    }

    fn build(delay: Duration, fail_open: bool) -> Self {
        let mut replies = HashMap::new();
        replies.insert(
            "/auth/v1/login".to_string(),
            MockReply::Json(json!({ "accessToken": ACCESS_TOKEN })),
        );
        replies.insert(
            "/device/v1/refresh".to_string(),
            MockReply::Json(json!({ "seqValue": SEQ_VALUE })),
        );
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
                sessions_opened: AtomicUsize::new(0),
                fail_open,
                delay,
            }),
        }
    }

    pub fn reply(&self, path: &str, reply: MockReply) -> &Self {
        self.inner.replies.lock().insert(path.to_string(), reply);
        self
    }

    pub fn fail(&self, path: &str, status: u16) -> &Self {
        self.reply(
            path,
            MockReply::Fail(RemoteError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
        )
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.inner.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSession for MockRemote {
    async fn send(&self, request: RemoteRequest) -> Result<Value, RemoteError> {
        let path = request.path.clone();
        self.inner.calls.lock().push(request);
        if !self.inner.delay.is_zero() {
            tokio::time::sleep(self.inner.delay).await;
        }
        let reply = self.inner.replies.lock().get(&path).cloned();
        match reply {
            Some(MockReply::Json(value)) => Ok(value),
            Some(MockReply::Fail(e)) => Err(e),
            None => Ok(json!({ "status": "ok" })),
        }
    }
}

impl RemoteApi for MockRemote {
    fn open_session(&self) -> Result<Arc<dyn RemoteSession>, RemoteError> {
        if self.inner.fail_open {
            return Err(RemoteError::Request("connection refused".to_string()));
        }
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.clone()))
    }
}

/// Canonical activation engine with no pacing delay
pub fn activation_engine(critical: &[&str]) -> WorkflowEngine<ActivationContext> {
    let critical: Vec<StepId> = critical.iter().map(|s| StepId::new(*s)).collect();
    let definition = ActivationPlan::canonical()
        .into_workflow(
            RequestTemplate::default(),
            Duration::ZERO,
            Duration::from_secs(5),
            &critical,
        )
        .unwrap();
    WorkflowEngine::new(definition).unwrap()
}

/// Poll `read` until the record reports completion
pub async fn wait_for_completion<F>(mut read: F, limit: Duration) -> ProgressRecord
where
    F: FnMut() -> ProgressRecord,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let record = read();
        if record.completed {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run did not complete in {:?}: {:?}",
            limit,
            record
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
