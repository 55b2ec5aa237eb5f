//! Parallel fan-out with a weighted consensus vote

use super::audit::AuditRecord;
use super::consensus::vote;
use super::error::OrchestratorError;
use super::Orchestrator;
use crate::protocol::types::{EnsembleResult, Request, Response};
use crate::providers::{ProviderAdapter, ProviderError};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

impl Orchestrator {
    /// Ask every available provider at once and vote on the answers.
    ///
    /// `min_consensus` defaults to the configured value (2). With fewer
    /// providers available the call degrades to a single fallback call
    /// wrapped as a one-member result. Errors only when every provider in a
    /// true multi-provider round fails.
    pub async fn call_ensemble(
        &self,
        request: &Request,
        min_consensus: Option<usize>,
    ) -> Result<EnsembleResult, OrchestratorError> {
        let min_consensus = min_consensus
            .unwrap_or(self.ensemble.min_consensus)
            .max(1);

        let available: Vec<&Arc<dyn ProviderAdapter>> = self
            .registry
            .iter()
            .filter(|adapter| self.is_callable(adapter.id()))
            .collect();

        if available.is_empty() {
            warn!("No provider available for ensemble {} request", request.task_type);
            return Ok(EnsembleResult::no_providers_available());
        }

        if available.len() < min_consensus {
            info!(
                "Only {} provider(s) available, {} needed for consensus; degrading to fallback",
                available.len(),
                min_consensus
            );
            // Usable providers only: routed ones in router order, then the rest
            let mut order: Vec<String> = self
                .router
                .priority_for(request.task_type)
                .into_iter()
                .filter(|id| available.iter().any(|a| a.id() == id))
                .collect();
            for adapter in &available {
                if !order.iter().any(|id| id == adapter.id()) {
                    order.push(adapter.id().to_string());
                }
            }
            let response = self.call_with_fallback(request, Some(order.as_slice())).await;
            return Ok(EnsembleResult::from_single(
                response,
                self.ensemble.vote.preview_chars,
            ));
        }

        let attempt_request = request.with_reduced_retries(self.ensemble.attempt_max_retries);
        info!(
            "Ensemble fan-out to [{}]",
            available
                .iter()
                .map(|a| a.id())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let outcomes = join_all(available.iter().map(|adapter| {
            let attempt_request = &attempt_request;
            async move {
                (
                    adapter.id().to_string(),
                    self.attempt(adapter, attempt_request).await,
                )
            }
        }))
        .await;

        let mut responses: Vec<Response> = Vec::with_capacity(outcomes.len());
        let mut failures: Vec<(String, ProviderError)> = Vec::new();
        for (provider_id, outcome) in outcomes {
            match outcome {
                Ok(response) => responses.push(response),
                Err(err) => failures.push((provider_id, err)),
            }
        }

        let Some(result) = vote(responses, |id| self.health.weight(id), self.ensemble.vote) else {
            error!("Every ensemble provider failed ({} attempted)", failures.len());
            return Err(OrchestratorError::EnsembleFailed { failures });
        };

        if !failures.is_empty() {
            warn!(
                "{} ensemble provider(s) failed and were left out of the vote",
                failures.len()
            );
        }
        info!(
            "Ensemble selected {} (consensus: {}, confidence {:.2}, {} vote(s))",
            result.selected_provider_id,
            result.consensus_achieved,
            result.confidence,
            result.voting_results.len()
        );

        self.emit(AuditRecord::ensemble(request, &result, self.preview_chars))
            .await;
        Ok(result)
    }
}
