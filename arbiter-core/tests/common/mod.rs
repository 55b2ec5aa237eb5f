//! Shared fixtures for orchestrator integration tests

#![allow(dead_code)]

use arbiter_core::orchestrator::{
    AuditError, AuditRecord, AuditSink, BreakerSettings, MemoryAuditSink, OrchestratorBuilder,
    PriorityRouter, RetryPolicy,
};
use arbiter_core::{AdapterReply, Orchestrator, ProviderAdapter, ProviderError, Request, TaskType};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Outcome = Result<String, ProviderError>;

/// Adapter that plays back scripted outcomes, then repeats a final one
pub struct ScriptedAdapter {
    id: String,
    script: Mutex<VecDeque<Outcome>>,
    then: Outcome,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl ScriptedAdapter {
    pub fn answering(id: &str, content: &str) -> Arc<Self> {
        Arc::new(Self::build(id, Vec::new(), Ok(content.to_string()), None))
    }

    pub fn failing(id: &str, error: ProviderError) -> Arc<Self> {
        Arc::new(Self::build(id, Vec::new(), Err(error), None))
    }

    pub fn scripted(id: &str, steps: Vec<Outcome>, then: Outcome) -> Arc<Self> {
        Arc::new(Self::build(id, steps, then, None))
    }

    pub fn slow(id: &str, content: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(id, Vec::new(), Ok(content.to_string()), Some(delay)))
    }

    fn build(id: &str, steps: Vec<Outcome>, then: Outcome, delay: Option<Duration>) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(steps.into()),
            then,
            delay,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn send(&self, _request: &Request) -> Result<AdapterReply, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.then.clone())
            .map(|content| AdapterReply::new(content, "scripted-1").with_tokens(10, 20))
    }
}

/// Sink that always refuses records
pub struct RejectingSink;

#[async_trait]
impl AuditSink for RejectingSink {
    async fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("disk full".to_string()))
    }
}

/// Sink whose writes never complete
pub struct StalledSink;

#[async_trait]
impl AuditSink for StalledSink {
    async fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Routing order of the scripted provider ids for general requests
pub const GENERAL_ORDER: [&str; 5] = ["a", "b", "c", "slow", "fast"];

/// Millisecond backoff so retry paths stay fast
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, 1).with_max_jitter_ms(1)
}

/// Builder with fast retries, a short breaker cooldown, scripted ids routed
/// for general requests and an in-memory sink
pub fn builder(audit: &Arc<MemoryAuditSink>) -> OrchestratorBuilder {
    Orchestrator::builder()
        .router(PriorityRouter::new().with_priority(TaskType::General, GENERAL_ORDER))
        .retry_policy(fast_retry(3))
        .breaker_settings(BreakerSettings {
            failure_threshold: 3,
            cooldown: Duration::from_millis(50),
        })
        .audit_sink(audit.clone())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
