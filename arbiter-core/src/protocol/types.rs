//! Core protocol types for orchestrated LLM calls
//!
//! This module contains the provider-agnostic data structures exchanged
//! between call sites and the orchestrator. The design prioritizes:
//! - Immutability: a `Request` is never mutated once issued; per-attempt
//!   adjustments produce a clone
//! - Type safety through enums for task types
//! - Serializability, so results can be handed to audit sinks and dashboards

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of work a request performs; drives provider priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Conversational copilot turns
    Conversational,
    /// Financial insight and analysis generation
    Analysis,
    /// Bulk categorization / classification
    Categorization,
    /// Long-form report drafting
    ReportDrafting,
    /// Anything without a more specific policy
    General,
}

impl TaskType {
    /// All task types, in a stable order
    pub const ALL: [TaskType; 5] = [
        TaskType::Conversational,
        TaskType::Analysis,
        TaskType::Categorization,
        TaskType::ReportDrafting,
        TaskType::General,
    ];

    /// Stable string identifier for this task type
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Conversational => "conversational",
            TaskType::Analysis => "analysis",
            TaskType::Categorization => "categorization",
            TaskType::ReportDrafting => "report_drafting",
            TaskType::General => "general",
        }
    }
}

impl Default for TaskType {
    fn default() -> Self {
        Self::General
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown task type: {}", s))
    }
}

/// A request for an answer from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Request {
    /// User prompt
    pub prompt: String,

    /// Optional system prompt, concatenated ahead of the user prompt by
    /// adapters without a native system role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Ask the provider for a JSON-only answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_mode: Option<bool>,

    /// Task type used for provider priority
    #[serde(default)]
    pub task_type: TaskType,

    /// Total attempts per provider, overriding the retry policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    /// Base backoff delay in milliseconds, overriding the retry policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

impl Request {
    /// Create a new request for the given prompt and task type
    pub fn new(prompt: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            prompt: prompt.into(),
            task_type,
            ..Default::default()
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request JSON-only output
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = Some(json_mode);
        self
    }

    /// Override the per-provider attempt budget
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    /// Override the base backoff delay
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = Some(retry_delay_ms);
        self
    }

    /// Clone of this request with its attempt budget capped at `max_attempts`
    pub fn with_reduced_retries(&self, max_attempts: u32) -> Self {
        let capped = self
            .retry_count
            .map_or(max_attempts, |count| count.min(max_attempts));
        Self {
            retry_count: Some(capped.max(1)),
            ..self.clone()
        }
    }

    /// System and user prompt joined for providers without a system role
    pub fn combined_prompt(&self) -> String {
        match self.system_prompt.as_deref() {
            Some(system) if !system.is_empty() => format!("{}\n\n{}", system, self.prompt),
            _ => self.prompt.clone(),
        }
    }

    /// Whether JSON mode was requested
    pub fn wants_json(&self) -> bool {
        self.json_mode.unwrap_or(false)
    }
}

/// Token accounting for a single response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u32,
    /// Completion tokens
    pub output: u32,
}

impl TokenUsage {
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u32 {
        self.input + self.output
    }
}

/// Provider id reported on synthetic responses
pub const SYNTHETIC_PROVIDER_ID: &str = "none";

/// Confidence of the "no providers available" response
pub const NO_PROVIDERS_CONFIDENCE: f64 = 0.1;

/// Confidence of the "all providers failed" response
pub const ALL_FAILED_CONFIDENCE: f64 = 0.2;

/// A single answer from one provider, or a synthetic placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Generated content
    pub content: String,

    /// Provider that produced the content
    pub provider_id: String,

    /// Model that produced the content
    pub model: String,

    /// Heuristic confidence in [0.1, 1.0]
    pub confidence: f64,

    /// Wall-clock latency including retries, in milliseconds
    pub latency_ms: u64,

    /// Token usage, when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
}

impl Response {
    /// Placeholder returned when no provider could even be attempted
    pub fn no_providers_available() -> Self {
        Self::synthetic(
            "AI providers are currently unavailable. No provider is configured or all circuits are open.",
            NO_PROVIDERS_CONFIDENCE,
        )
    }

    /// Placeholder returned when every attempted provider failed
    pub fn all_providers_failed() -> Self {
        Self::synthetic(
            "AI providers failed to produce a response. Please fall back to rule-based output.",
            ALL_FAILED_CONFIDENCE,
        )
    }

    fn synthetic(content: &str, confidence: f64) -> Self {
        Self {
            content: content.to_string(),
            provider_id: SYNTHETIC_PROVIDER_ID.to_string(),
            model: SYNTHETIC_PROVIDER_ID.to_string(),
            confidence,
            latency_ms: 0,
            tokens_used: None,
        }
    }

    /// Whether this response is a degraded placeholder rather than a real answer
    pub fn is_synthetic(&self) -> bool {
        self.provider_id == SYNTHETIC_PROVIDER_ID
    }
}

/// One provider's ballot in an ensemble vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    pub provider_id: String,
    /// Truncated content preview
    pub vote_preview: String,
    pub confidence: f64,
}

/// Reconciled outcome of an ensemble call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Content of the winning response
    pub content: String,

    /// Whether the providers broadly agreed (confidence spread below threshold)
    pub consensus_achieved: bool,

    /// Mean confidence on consensus, otherwise the winner's own confidence
    pub confidence: f64,

    /// Every successful response that took part in the vote
    pub responses: Vec<Response>,

    /// Per-provider voting breakdown
    pub voting_results: Vec<VoteResult>,

    /// Provider whose content was selected
    pub selected_provider_id: String,
}

impl EnsembleResult {
    /// Placeholder returned when no provider is available at all
    pub fn no_providers_available() -> Self {
        let response = Response::no_providers_available();
        Self {
            content: response.content,
            consensus_achieved: false,
            confidence: response.confidence,
            responses: Vec::new(),
            voting_results: Vec::new(),
            selected_provider_id: SYNTHETIC_PROVIDER_ID.to_string(),
        }
    }

    /// Wrap a single response as a one-member ensemble without consensus
    pub fn from_single(response: Response, preview_chars: usize) -> Self {
        let voting_results = if response.is_synthetic() {
            Vec::new()
        } else {
            vec![VoteResult {
                provider_id: response.provider_id.clone(),
                vote_preview: truncate_chars(&response.content, preview_chars),
                confidence: response.confidence,
            }]
        };
        Self {
            content: response.content.clone(),
            consensus_achieved: false,
            confidence: response.confidence,
            selected_provider_id: response.provider_id.clone(),
            responses: vec![response],
            voting_results,
        }
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
