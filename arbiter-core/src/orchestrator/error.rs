//! Orchestrator-level errors

use crate::config::ConfigError;
use crate::providers::ProviderError;
use thiserror::Error;

/// Errors surfaced by the orchestrator itself.
///
/// Fallback calls never produce one of these; only a fully failed ensemble
/// round and construction from configuration do.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Every provider in an ensemble round failed
    #[error("all {} ensemble providers failed: {}", .failures.len(), render_failures(.failures))]
    EnsembleFailed {
        /// Provider id and final error, in fan-out order
        failures: Vec<(String, ProviderError)>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] ProviderError),
}

fn render_failures(failures: &[(String, ProviderError)]) -> String {
    failures
        .iter()
        .map(|(id, err)| format!("{}: {}", id, err.summary()))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensemble_failure_lists_every_provider() {
        let err = OrchestratorError::EnsembleFailed {
            failures: vec![
                ("openai".to_string(), ProviderError::http(503, "overloaded")),
                ("gemini".to_string(), ProviderError::Timeout(30_000)),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("all 2 ensemble providers failed"));
        assert!(text.contains("openai:"));
        assert!(text.contains("gemini:"));
    }
}
