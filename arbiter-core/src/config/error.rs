//! Errors raised while loading an orchestrator configuration

use std::fmt;
use thiserror::Error;

/// Why a configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// YAML or JSON syntax/shape error, with the location when the parser
    /// reports one
    #[error("cannot parse '{path}' (line {}, column {}): {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    ParseError {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),

    /// `${VAR}` in a field that cannot be left empty
    #[error("{field} references unset environment variable '{var}'")]
    EnvVarNotFound { var: String, field: String },
}

/// A rejected value and where it sits, e.g. `routing.priorities.analysis[1]`
#[derive(Debug, Error)]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
    /// Hint for the operator
    pub context: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_path, self.kind)?;
        match &self.context {
            Some(hint) => write!(f, " ({})", hint),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("must not be empty")]
    Missing,

    #[error("{message}")]
    OutOfRange { message: String },

    #[error("{message}")]
    Malformed { message: String },

    #[error("provider id '{id}' is declared more than once")]
    DuplicateProvider { id: String },

    #[error("no provider with id '{id}' is declared")]
    UnknownProvider { id: String },

    #[error("bad URL: {message}")]
    InvalidUrl { message: String },

    #[error("config version {found} is not supported (expected {expected})")]
    UnsupportedVersion { expected: String, found: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn required(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Missing)
    }

    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(field_path, ValidationErrorKind::OutOfRange { message })
    }

    pub fn invalid_format(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(field_path, ValidationErrorKind::Malformed { message })
    }

    pub fn invalid_url(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(field_path, ValidationErrorKind::InvalidUrl { message })
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_path_and_hint() {
        let err = ValidationError::new(
            "routing.priorities.analysis[1]",
            ValidationErrorKind::UnknownProvider {
                id: "mistral".to_string(),
            },
        )
        .with_context("declare it under providers");

        assert_eq!(
            err.to_string(),
            "routing.priorities.analysis[1]: no provider with id 'mistral' is declared (declare it under providers)"
        );
    }

    #[test]
    fn test_env_var_error_names_the_field() {
        let err = ConfigError::EnvVarNotFound {
            var: "LOCAL_URL".to_string(),
            field: "providers[0].base_url".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "providers[0].base_url references unset environment variable 'LOCAL_URL'"
        );
    }
}
