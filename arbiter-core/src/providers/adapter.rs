//! Provider adapter trait and registry
//!
//! Defines the core abstraction for LLM backends. Each backend is one
//! `ProviderAdapter`; the orchestrator only ever sees the trait, and
//! backends are looked up by id in a `ProviderRegistry`.

use crate::protocol::types::{Request, TokenUsage};
use crate::providers::error::ProviderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Raw answer from a backend, before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterReply {
    /// Generated content
    pub content: String,

    /// Model that produced the content
    pub model: String,

    /// Token usage, if the backend reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
}

impl AdapterReply {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, input: u32, output: u32) -> Self {
        self.tokens_used = Some(TokenUsage::new(input, output));
        self
    }
}

/// Core trait that every backend adapter implements
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier (e.g. "openai")
    fn id(&self) -> &str;

    /// Default model this adapter targets
    fn model(&self) -> &str;

    /// Translate the request to the backend's wire format, send it, and
    /// translate the answer back
    async fn send(&self, request: &Request) -> ProviderResult<AdapterReply>;
}

/// Ordered map from provider id to adapter instance
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any adapter with the same id in place
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        match self.adapters.iter().position(|a| a.id() == adapter.id()) {
            Some(idx) => self.adapters[idx] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Provider ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Tells the orchestrator whether a provider has credentials configured.
///
/// An unconfigured provider is permanently unavailable regardless of its
/// circuit state.
pub trait CredentialSource: Send + Sync {
    fn is_configured(&self, provider_id: &str) -> bool;
}

/// Fixed set of configured provider ids
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    configured: HashSet<String>,
}

impl StaticCredentials {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configured: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark a provider as configured
    pub fn with(mut self, id: impl Into<String>) -> Self {
        self.configured.insert(id.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn is_configured(&self, provider_id: &str) -> bool {
        self.configured.contains(provider_id)
    }
}

/// Checks the process environment for each provider's API key variable
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    vars: Vec<(String, String)>,
}

impl EnvCredentials {
    /// Conventional variables for the built-in adapters
    pub fn standard() -> Self {
        Self::default()
            .map("openai", "OPENAI_API_KEY")
            .map("anthropic", "ANTHROPIC_API_KEY")
            .map("gemini", "GEMINI_API_KEY")
    }

    /// Map a provider id to the environment variable holding its key
    pub fn map(mut self, provider_id: impl Into<String>, var: impl Into<String>) -> Self {
        let provider_id = provider_id.into();
        self.vars.retain(|(id, _)| *id != provider_id);
        self.vars.push((provider_id, var.into()));
        self
    }
}

impl CredentialSource for EnvCredentials {
    fn is_configured(&self, provider_id: &str) -> bool {
        self.vars
            .iter()
            .find(|(id, _)| id == provider_id)
            .and_then(|(_, var)| std::env::var(var).ok())
            .is_some_and(|value| !value.trim().is_empty())
    }
}
