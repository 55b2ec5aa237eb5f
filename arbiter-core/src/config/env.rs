//! Environment variable interpolation for configuration
//!
//! Only `api_key` and `base_url` are interpolated. An API key that names a
//! missing variable leaves its provider unconfigured; a base URL that names
//! one is a load error.

use super::error::ConfigError;
use super::schema::OrchestratorConfig;
use super::secrets::SecretString;
use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
});

/// Interpolate the env-aware fields of a loaded configuration
pub fn interpolate_config_env_vars(config: &mut OrchestratorConfig) -> Result<(), ConfigError> {
    for (i, provider) in config.providers.iter_mut().enumerate() {
        if let Some(key) = &provider.api_key {
            if ENV_VAR.is_match(key.expose_secret()) {
                provider.api_key = match interpolate_value(key.expose_secret()) {
                    Ok(value) => Some(SecretString::new(value)),
                    Err(var) => {
                        debug!(
                            provider_id = %provider.id,
                            var = %var,
                            "API key variable not set; provider left unconfigured"
                        );
                        None
                    }
                };
            } else if !key.is_empty() {
                warn!(
                    provider_id = %provider.id,
                    "API key is set inline; prefer ${{ENV_VAR}} references"
                );
            }
        }

        if let Some(base_url) = &provider.base_url {
            if ENV_VAR.is_match(base_url) {
                let resolved =
                    interpolate_value(base_url).map_err(|var| ConfigError::EnvVarNotFound {
                        var,
                        field: format!("providers[{}].base_url", i),
                    })?;
                provider.base_url = Some(resolved);
            }
        }
    }

    Ok(())
}

/// Replace every `${VAR}` in `value`; `Err` carries the first missing name
fn interpolate_value(value: &str) -> Result<String, String> {
    let mut missing = None;
    let replaced = ENV_VAR.replace_all(value, |cap: &Captures<'_>| {
        match env::var(&cap[1]) {
            Ok(v) => v,
            Err(_) => {
                missing.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(var),
        None => Ok(replaced.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProviderConfig, ProviderKind};

    fn config_with(api_key: &str, base_url: Option<&str>) -> OrchestratorConfig {
        let mut config: OrchestratorConfig =
            serde_yaml::from_str("version: \"0.1\"").expect("minimal config parses");
        config.providers.push(ProviderConfig {
            id: "openai".to_string(),
            kind: ProviderKind::OpenAI,
            api_key: Some(SecretString::new(api_key)),
            base_url: base_url.map(str::to_string),
            model: None,
            enabled: true,
        });
        config
    }

    #[test]
    fn test_interpolates_api_key() {
        env::set_var("ARBITER_ENV_TEST_KEY", "sk-from-env");
        let mut config = config_with("${ARBITER_ENV_TEST_KEY}", None);
        interpolate_config_env_vars(&mut config).unwrap();
        assert_eq!(
            config.providers[0].api_key.as_ref().unwrap().expose_secret(),
            "sk-from-env"
        );
        env::remove_var("ARBITER_ENV_TEST_KEY");
    }

    #[test]
    fn test_missing_key_var_leaves_provider_unconfigured() {
        let mut config = config_with("${ARBITER_ENV_TEST_ABSENT}", None);
        interpolate_config_env_vars(&mut config).unwrap();
        assert!(config.providers[0].api_key.is_none());
        assert!(!config.providers[0].is_configured());
    }

    #[test]
    fn test_missing_base_url_var_is_an_error() {
        let mut config = config_with("sk-literal", Some("${ARBITER_ENV_TEST_NO_URL}/v1"));
        let err = interpolate_config_env_vars(&mut config).unwrap_err();
        match err {
            ConfigError::EnvVarNotFound { var, field } => {
                assert_eq!(var, "ARBITER_ENV_TEST_NO_URL");
                assert_eq!(field, "providers[0].base_url");
            }
            other => panic!("Expected EnvVarNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_vars_in_one_value() {
        env::set_var("ARBITER_ENV_TEST_HOST", "localhost");
        env::set_var("ARBITER_ENV_TEST_PORT", "8080");
        assert_eq!(
            interpolate_value("http://${ARBITER_ENV_TEST_HOST}:${ARBITER_ENV_TEST_PORT}").unwrap(),
            "http://localhost:8080"
        );
        env::remove_var("ARBITER_ENV_TEST_HOST");
        env::remove_var("ARBITER_ENV_TEST_PORT");
    }
}
