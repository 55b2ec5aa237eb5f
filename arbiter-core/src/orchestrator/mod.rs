//! Provider orchestration
//!
//! The [`Orchestrator`] owns the registry, health tracker, circuit breaker,
//! router, retry policy and audit sink. It is safe to share behind an `Arc`
//! and to call concurrently: all mutable state lives in per-provider locks.

pub mod audit;
pub mod circuit;
pub mod confidence;
pub mod consensus;
mod ensemble;
pub mod error;
mod fallback;
pub mod health;
pub mod retry;
pub mod routing;

pub use audit::{
    AuditError, AuditRecord, AuditSink, CallMode, MemoryAuditSink, NullAuditSink,
    TracingAuditSink,
};
pub use circuit::{BreakerSettings, CircuitBreaker, CircuitState, CircuitTransition};
pub use confidence::estimate_confidence;
pub use consensus::{vote, VoteSettings};
pub use error::OrchestratorError;
pub use health::{HealthTracker, ProviderHealth};
pub use retry::{with_retry, RetryExecutor, RetryFailure, RetryPolicy, Retried};
pub use routing::PriorityRouter;

use crate::config::{ConfigValidator, OrchestratorConfig, ProviderKind, SafeLogging};
use crate::http::HttpClient;
use crate::protocol::types::{Request, Response};
use crate::providers::{
    AnthropicAdapter, CredentialSource, GeminiAdapter, OpenAIAdapter, ProviderAdapter,
    ProviderError, ProviderRegistry, StaticCredentials,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default truncation length of audit previews
pub const DEFAULT_AUDIT_PREVIEW_CHARS: usize = 200;

/// Default time a call waits for the audit sink before moving on
pub const DEFAULT_AUDIT_HANDOFF: Duration = Duration::from_millis(1000);

/// Ensemble tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleSettings {
    /// Providers needed for a true ensemble round
    pub min_consensus: usize,
    /// Attempt budget applied to each fan-out call
    pub attempt_max_retries: u32,
    pub vote: VoteSettings,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            min_consensus: 2,
            attempt_max_retries: 1,
            vote: VoteSettings::default(),
        }
    }
}

/// Routes requests across providers with fallback, retries, circuit
/// breaking and ensemble voting
pub struct Orchestrator {
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    health: HealthTracker,
    breaker: CircuitBreaker,
    router: PriorityRouter,
    retry: RetryPolicy,
    ensemble: EnsembleSettings,
    request_timeout: Option<Duration>,
    audit: Arc<dyn AuditSink>,
    audit_handoff: Duration,
    preview_chars: usize,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Build an orchestrator from a loaded, validated configuration.
    ///
    /// Disabled providers are not registered. Enabled providers without a
    /// key are registered but reported as unconfigured, so they are skipped
    /// at call time.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        ConfigValidator::new()
            .validate(config)
            .map_err(|e| OrchestratorError::Config(e.into()))?;

        let http = HttpClient::with_config(
            Duration::from_millis(config.timeouts.connect_timeout_ms),
            Duration::from_millis(config.timeouts.http_timeout_ms),
            10,
        )
        .map_err(OrchestratorError::Client)?;

        let mut builder = Self::builder()
            .credentials(StaticCredentials::new(config.configured_provider_ids()))
            .router(config.routing.router())
            .retry_policy(config.retry.policy())
            .breaker_settings(config.circuit_breaker.settings())
            .ensemble_settings(config.ensemble.settings())
            .preview_chars(config.audit.preview_chars)
            .audit_handoff(Duration::from_millis(config.audit.handoff_timeout_ms));

        if let Some(ms) = config.timeouts.request_timeout_ms {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }

        for provider in &config.providers {
            if !provider.enabled {
                debug!("Skipping disabled provider {}", provider.safe_for_logging());
                continue;
            }
            info!("Registering provider {}", provider.safe_for_logging());
            let key = provider.api_key.clone().unwrap_or_default();
            let adapter: Arc<dyn ProviderAdapter> = match provider.kind {
                ProviderKind::OpenAI => {
                    let mut adapter = OpenAIAdapter::new(key, http.clone()).with_id(&provider.id);
                    if let Some(url) = &provider.base_url {
                        adapter = adapter.with_base_url(url);
                    }
                    if let Some(model) = &provider.model {
                        adapter = adapter.with_model(model);
                    }
                    Arc::new(adapter)
                }
                ProviderKind::Anthropic => {
                    let mut adapter =
                        AnthropicAdapter::new(key, http.clone()).with_id(&provider.id);
                    if let Some(url) = &provider.base_url {
                        adapter = adapter.with_base_url(url);
                    }
                    if let Some(model) = &provider.model {
                        adapter = adapter.with_model(model);
                    }
                    Arc::new(adapter)
                }
                ProviderKind::Gemini => {
                    let mut adapter = GeminiAdapter::new(key, http.clone()).with_id(&provider.id);
                    if let Some(url) = &provider.base_url {
                        adapter = adapter.with_base_url(url);
                    }
                    if let Some(model) = &provider.model {
                        adapter = adapter.with_model(model);
                    }
                    Arc::new(adapter)
                }
            };
            builder = builder.provider(adapter);
        }

        Ok(builder.build())
    }

    /// Read-only per-provider health, in registration order
    pub fn get_health_status(&self) -> Vec<ProviderHealth> {
        self.health.snapshot()
    }

    /// Read-only per-provider breaker state, in registration order
    pub fn circuit_states(&self) -> Vec<CircuitState> {
        self.breaker.snapshot()
    }

    /// Whether at least one provider is registered, credentialed and not
    /// blocked by its breaker
    pub fn has_any_provider_available(&self) -> bool {
        self.registry
            .iter()
            .any(|adapter| self.is_callable(adapter.id()))
    }

    /// Registered provider ids, in registration order
    pub fn provider_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    fn is_callable(&self, provider_id: &str) -> bool {
        if !self.credentials.is_configured(provider_id) {
            debug!("Skipping {}: no credentials", provider_id);
            return false;
        }
        if !self.breaker.is_available(provider_id) {
            debug!("Skipping {}: circuit open", provider_id);
            return false;
        }
        true
    }

    /// One provider call with retries, recording the outcome on the health
    /// tracker and the breaker exactly once
    async fn attempt(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        request: &Request,
    ) -> Result<Response, ProviderError> {
        let provider_id = adapter.id();
        let executor = RetryExecutor::new(self.retry.for_request(request));
        let started = Instant::now();

        let outcome = executor
            .execute(move || self.send_once(adapter, request))
            .await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Retried { value: reply, attempts }) => {
                self.health.record_success(provider_id, latency_ms);
                self.breaker.record_success(provider_id);
                let confidence =
                    estimate_confidence(&reply.content, self.health.success_rate(provider_id));
                debug!(
                    "{} ({}) answered in {}ms after {} attempt(s), confidence {:.2}",
                    provider_id,
                    adapter.model(),
                    latency_ms,
                    attempts,
                    confidence
                );
                Ok(Response {
                    content: reply.content,
                    provider_id: provider_id.to_string(),
                    model: reply.model,
                    confidence,
                    latency_ms,
                    tokens_used: reply.tokens_used,
                })
            }
            Err(RetryFailure { error, attempts }) => {
                warn!(
                    "{} failed after {} attempt(s): {}",
                    provider_id, attempts, error
                );
                self.health.record_failure(provider_id, &error.summary());
                if self.breaker.record_failure(provider_id).opened() {
                    self.health.mark_unhealthy(provider_id);
                }
                Err(error)
            }
        }
    }

    async fn send_once(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        request: &Request,
    ) -> Result<crate::providers::AdapterReply, ProviderError> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, adapter.send(request))
                .await
                .map_err(|_| {
                    ProviderError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
                })?,
            None => adapter.send(request).await,
        }
    }

    /// Hand a record to the sink on its own task.
    ///
    /// The call waits at most `audit_handoff`; a slower sink keeps running
    /// in the background and its failures are only logged.
    async fn emit(&self, record: AuditRecord) {
        let sink = Arc::clone(&self.audit);
        let handle = tokio::spawn(async move { sink.record(record).await });

        match tokio::time::timeout(self.audit_handoff, handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!("Audit sink rejected record: {}", e),
            Ok(Err(e)) => warn!("Audit task aborted: {}", e),
            Err(_) => warn!(
                "Audit sink still busy after {}ms; not waiting for it",
                self.audit_handoff.as_millis()
            ),
        }
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    registry: ProviderRegistry,
    credentials: Option<Arc<dyn CredentialSource>>,
    router: PriorityRouter,
    retry: RetryPolicy,
    breaker: BreakerSettings,
    ensemble: EnsembleSettings,
    request_timeout: Option<Duration>,
    audit: Option<Arc<dyn AuditSink>>,
    audit_handoff: Duration,
    preview_chars: usize,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            credentials: None,
            router: PriorityRouter::new(),
            retry: RetryPolicy::default(),
            breaker: BreakerSettings::default(),
            ensemble: EnsembleSettings::default(),
            request_timeout: None,
            audit: None,
            audit_handoff: DEFAULT_AUDIT_HANDOFF,
            preview_chars: DEFAULT_AUDIT_PREVIEW_CHARS,
        }
    }

    /// Register an adapter; a second adapter with the same id replaces the first
    pub fn provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.registry.register(adapter);
        self
    }

    /// Credential source; defaults to treating every registered provider
    /// as configured
    pub fn credentials(mut self, credentials: impl CredentialSource + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn router(mut self, router: PriorityRouter) -> Self {
        self.router = router;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn breaker_settings(mut self, settings: BreakerSettings) -> Self {
        self.breaker = settings;
        self
    }

    pub fn ensemble_settings(mut self, settings: EnsembleSettings) -> Self {
        self.ensemble = settings;
        self
    }

    /// Deadline for each individual adapter call
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Audit destination; defaults to [`TracingAuditSink`]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Longest a call waits for the audit sink to accept a record
    pub fn audit_handoff(mut self, timeout: Duration) -> Self {
        self.audit_handoff = timeout;
        self
    }

    pub fn preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn build(self) -> Orchestrator {
        let ids = self.registry.ids();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(StaticCredentials::new(ids.iter().cloned())));

        info!("Orchestrator ready with providers: [{}]", ids.join(", "));
        for id in ids.iter().filter(|id| !self.router.mentions(id)) {
            warn!(
                "Provider {} is not in any routing table; only ensembles and explicit orders will use it",
                id
            );
        }

        Orchestrator {
            health: HealthTracker::new(ids.iter().cloned()),
            breaker: CircuitBreaker::new(ids.iter().cloned(), self.breaker),
            registry: self.registry,
            credentials,
            router: self.router,
            retry: self.retry,
            ensemble: self.ensemble,
            request_timeout: self.request_timeout,
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            audit_handoff: self.audit_handoff,
            preview_chars: self.preview_chars,
        }
    }
}
