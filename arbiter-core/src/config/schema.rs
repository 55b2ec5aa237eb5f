//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::{SafeLogging, SecretString};
use crate::orchestrator::circuit::BreakerSettings;
use crate::orchestrator::consensus::VoteSettings;
use crate::orchestrator::retry::RetryPolicy;
use crate::orchestrator::routing::PriorityRouter;
use crate::orchestrator::EnsembleSettings;
use crate::protocol::types::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Supported configuration schema version
pub const SUPPORTED_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Provider backends, in registration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Retry settings applied to every provider call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker settings
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Priority overrides per task type
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Ensemble voting settings
    #[serde(default)]
    pub ensemble: EnsembleConfig,

    /// HTTP and per-call timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Audit record settings
    #[serde(default)]
    pub audit: AuditConfig,
}

/// One provider backend
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider id used in routing tables
    pub id: String,

    /// Wire protocol spoken by this provider
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// API key (supports `${ENV_VAR}`; a missing variable leaves the
    /// provider unconfigured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Base URL override; defaults per provider type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model override; defaults per provider type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Whether this provider is registered at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Enabled and carrying a non-empty API key
    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.as_ref().is_some_and(|key| !key.is_empty())
    }
}

impl SafeLogging for ProviderConfig {
    fn safe_for_logging(&self) -> String {
        format!(
            "{} ({:?}, key: {}, enabled: {})",
            self.id,
            self.kind,
            self.api_key
                .as_ref()
                .map_or_else(|| "[NONE]".to_string(), SecretString::partial_redact),
            self.enabled
        )
    }
}

/// Supported provider wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Gemini,
}

/// Retry policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per provider, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Maximum random jitter added to each backoff
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_jitter_ms: default_max_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay_ms).with_max_jitter_ms(self.max_jitter_ms)
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }
}

/// Routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Task type -> ordered provider ids, replacing the built-in order
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub priorities: HashMap<TaskType, Vec<String>>,
}

impl RoutingConfig {
    /// Built-in policy with this config's overrides applied
    pub fn router(&self) -> PriorityRouter {
        self.priorities
            .iter()
            .fold(PriorityRouter::new(), |router, (task, order)| {
                router.with_priority(*task, order.iter().cloned())
            })
    }
}

/// Ensemble configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnsembleConfig {
    /// Providers needed for a true ensemble round
    #[serde(default = "default_min_consensus")]
    pub min_consensus: usize,

    /// Confidence spread below which providers agree
    #[serde(default = "default_agreement_spread")]
    pub agreement_spread: f64,

    /// Attempt budget for each fan-out call
    #[serde(default = "default_attempt_max_retries")]
    pub attempt_max_retries: u32,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            min_consensus: default_min_consensus(),
            agreement_spread: default_agreement_spread(),
            attempt_max_retries: default_attempt_max_retries(),
        }
    }
}

impl EnsembleConfig {
    pub fn settings(&self) -> EnsembleSettings {
        EnsembleSettings {
            min_consensus: self.min_consensus,
            attempt_max_retries: self.attempt_max_retries,
            vote: VoteSettings {
                agreement_spread: self.agreement_spread,
                ..Default::default()
            },
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// HTTP client timeout in milliseconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Deadline for a single adapter call, enforced by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            http_timeout_ms: default_http_timeout(),
            request_timeout_ms: None,
        }
    }
}

/// Audit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Characters kept in input/output previews
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Longest a call waits on the audit sink (milliseconds)
    #[serde(default = "default_audit_handoff")]
    pub handoff_timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            handoff_timeout_ms: default_audit_handoff(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay() -> u64 { 1000 }
fn default_max_jitter() -> u64 { 500 }
fn default_failure_threshold() -> u32 { 3 }
fn default_cooldown() -> u64 { 60_000 }
fn default_min_consensus() -> usize { 2 }
fn default_agreement_spread() -> f64 { 0.2 }
fn default_attempt_max_retries() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_http_timeout() -> u64 { 60_000 }
fn default_preview_chars() -> usize { 200 }
fn default_audit_handoff() -> u64 { 1000 }

impl OrchestratorConfig {
    /// Ids of providers that are enabled and have credentials
    pub fn configured_provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.id.clone())
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != SUPPORTED_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    expected: SUPPORTED_VERSION.to_string(),
                    found: self.version.clone(),
                },
            ));
        }

        let mut seen_ids = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_ids.insert(&provider.id) {
                return Err(ValidationError::new(
                    format!("providers[{}].id", i),
                    ValidationErrorKind::DuplicateProvider {
                        id: provider.id.clone(),
                    },
                ));
            }

            provider.validate(&format!("providers[{}]", i))?;
        }

        self.retry.validate("retry")?;
        self.circuit_breaker.validate("circuit_breaker")?;
        self.ensemble.validate("ensemble")?;

        Ok(())
    }
}

impl ProviderConfig {
    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.id", path)));
        }

        if let Some(base_url) = &self.base_url {
            let field = format!("{}.base_url", path);
            let url = url::Url::parse(base_url)
                .map_err(|e| ValidationError::invalid_url(&field, e.to_string()))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ValidationError::invalid_url(
                    field,
                    format!("scheme must be http or https, got {}", url.scheme()),
                ));
            }
        }

        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ValidationError::invalid_format(
                format!("{}.model", path),
                "Model must not be blank",
            ));
        }

        Ok(())
    }
}

impl RetryConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_attempts", path),
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.failure_threshold == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.failure_threshold", path),
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

impl EnsembleConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.min_consensus == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.min_consensus", path),
                "Must be at least 1",
            ));
        }

        if !(self.agreement_spread > 0.0 && self.agreement_spread <= 1.0) {
            return Err(ValidationError::out_of_range(
                format!("{}.agreement_spread", path),
                "Must be in (0.0, 1.0]",
            ));
        }

        if self.attempt_max_retries == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.attempt_max_retries", path),
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}
