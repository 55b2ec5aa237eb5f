//! Configuration module
//!
//! Loads the orchestrator configuration from YAML or JSON, resolves
//! `${ENV_VAR}` references in provider credentials and validates the
//! result before an [`Orchestrator`](crate::orchestrator::Orchestrator) is
//! built from it.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AuditConfig, CircuitBreakerConfig, EnsembleConfig, OrchestratorConfig, ProviderConfig,
    ProviderKind, RetryConfig, RoutingConfig, TimeoutConfig, SUPPORTED_VERSION,
};
pub use secrets::{SafeLogging, SecretString};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<OrchestratorConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    let config: OrchestratorConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<OrchestratorConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    let config: OrchestratorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: OrchestratorConfig) -> ConfigResult<OrchestratorConfig> {
    env::interpolate_config_env_vars(&mut config)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TaskType;

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
version: "0.1"
providers:
  - id: anthropic
    type: anthropic
    api_key: ${ANTHROPIC_API_KEY}
  - id: local
    type: openai
    base_url: http://localhost:8080/v1
    model: llama-3
    enabled: false
retry:
  max_attempts: 2
routing:
  priorities:
    report_drafting: [anthropic]
ensemble:
  min_consensus: 3
timeouts:
  request_timeout_ms: 30000
audit:
  preview_chars: 80
"#;
        let config: OrchestratorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].kind, ProviderKind::OpenAI);
        assert!(!config.providers[1].enabled);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(
            config.routing.priorities[&TaskType::ReportDrafting],
            vec!["anthropic"]
        );
        assert_eq!(config.ensemble.min_consensus, 3);
        assert_eq!(config.timeouts.request_timeout_ms, Some(30000));
        assert_eq!(config.audit.preview_chars, 80);
        assert_eq!(config.audit.handoff_timeout_ms, 1000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "version: \"0.1\"\nstrategy: round_robin\n";
        assert!(serde_yaml::from_str::<OrchestratorConfig>(yaml).is_err());
    }
}
