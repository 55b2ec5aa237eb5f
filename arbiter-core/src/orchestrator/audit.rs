//! Audit records and sinks
//!
//! One record is emitted per terminal call outcome. Sinks are collaborators:
//! their failures are logged by the orchestrator and never reach callers.

use crate::protocol::types::{EnsembleResult, Request, Response, TaskType, VoteResult};
use crate::protocol::truncate_chars;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// How the call was orchestrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    Fallback,
    Ensemble,
}

/// Write-once summary of one orchestrated call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mode: CallMode,
    pub task_type: TaskType,
    /// Providers whose answer was used
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub input_preview: String,
    pub output_preview: String,
    pub confidence: f64,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_achieved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting: Option<Vec<VoteResult>>,
}

impl AuditRecord {
    /// Record for a successful fallback call
    pub fn single(request: &Request, response: &Response, preview_chars: usize) -> Self {
        let tokens = response.tokens_used.unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mode: CallMode::Fallback,
            task_type: request.task_type,
            providers: vec![response.provider_id.clone()],
            model: Some(response.model.clone()),
            input_tokens: tokens.input,
            output_tokens: tokens.output,
            input_preview: truncate_chars(&request.prompt, preview_chars),
            output_preview: truncate_chars(&response.content, preview_chars),
            confidence: response.confidence,
            latency_ms: response.latency_ms,
            success: true,
            error: None,
            consensus_achieved: None,
            voting: None,
        }
    }

    /// Record for a fallback call where every candidate failed
    pub fn exhausted(
        request: &Request,
        attempted: Vec<String>,
        placeholder: &Response,
        error: String,
        latency_ms: u64,
        preview_chars: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mode: CallMode::Fallback,
            task_type: request.task_type,
            providers: attempted,
            model: None,
            input_tokens: 0,
            output_tokens: 0,
            input_preview: truncate_chars(&request.prompt, preview_chars),
            output_preview: truncate_chars(&placeholder.content, preview_chars),
            confidence: placeholder.confidence,
            latency_ms,
            success: false,
            error: Some(error),
            consensus_achieved: None,
            voting: None,
        }
    }

    /// Record for a completed ensemble round: token totals, mean latency
    /// and the full voting breakdown
    pub fn ensemble(request: &Request, result: &EnsembleResult, preview_chars: usize) -> Self {
        let (input_tokens, output_tokens) = result
            .responses
            .iter()
            .filter_map(|r| r.tokens_used)
            .fold((0, 0), |(i, o), t| (i + t.input, o + t.output));
        let latency_ms = if result.responses.is_empty() {
            0
        } else {
            result.responses.iter().map(|r| r.latency_ms).sum::<u64>()
                / result.responses.len() as u64
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mode: CallMode::Ensemble,
            task_type: request.task_type,
            providers: result
                .responses
                .iter()
                .map(|r| r.provider_id.clone())
                .collect(),
            model: None,
            input_tokens,
            output_tokens,
            input_preview: truncate_chars(&request.prompt, preview_chars),
            output_preview: truncate_chars(&result.content, preview_chars),
            confidence: result.confidence,
            latency_ms,
            success: true,
            error: None,
            consensus_achieved: Some(result.consensus_achieved),
            voting: Some(result.voting_results.clone()),
        }
    }
}

/// Audit sink failures
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to serialize audit record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Emits each record as a structured tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&record)?;
        info!(
            target: "arbiter::audit",
            audit_id = %record.id,
            task_type = %record.task_type,
            success = record.success,
            confidence = record.confidence,
            latency_ms = record.latency_ms,
            "{}",
            payload
        );
        Ok(())
    }
}

/// Keeps records in memory, for inspection and tests
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TokenUsage;

    fn response(provider: &str, latency_ms: u64, tokens: (u32, u32)) -> Response {
        Response {
            content: "x".repeat(300),
            provider_id: provider.to_string(),
            model: "m".to_string(),
            confidence: 0.8,
            latency_ms,
            tokens_used: Some(TokenUsage::new(tokens.0, tokens.1)),
        }
    }

    #[test]
    fn test_single_record_truncates_previews() {
        let request = Request::new("p".repeat(50), TaskType::Analysis);
        let record = AuditRecord::single(&request, &response("a", 10, (3, 4)), 20);
        assert_eq!(record.input_preview.len(), 20);
        assert_eq!(record.output_preview.len(), 20);
        assert_eq!(record.input_tokens, 3);
        assert!(record.success);
    }

    #[test]
    fn test_ensemble_record_totals() {
        let request = Request::new("p", TaskType::Analysis);
        let result = crate::orchestrator::consensus::vote(
            vec![response("a", 100, (10, 20)), response("b", 300, (5, 5))],
            |_| 1.0,
            Default::default(),
        )
        .unwrap();

        let record = AuditRecord::ensemble(&request, &result, 50);
        assert_eq!(record.mode, CallMode::Ensemble);
        assert_eq!(record.input_tokens, 15);
        assert_eq!(record.output_tokens, 25);
        assert_eq!(record.latency_ms, 200);
        assert_eq!(record.voting.as_ref().unwrap().len(), 2);
        assert_eq!(record.consensus_achieved, Some(true));
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemoryAuditSink::new();
        let request = Request::new("p", TaskType::General);
        sink.record(AuditRecord::single(&request, &response("a", 1, (0, 0)), 10))
            .await
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].providers, vec!["a"]);
    }
}
