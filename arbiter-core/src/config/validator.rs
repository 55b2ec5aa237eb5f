//! Configuration validation utilities

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::OrchestratorConfig;
use std::collections::HashSet;

/// Configuration validator with cross-section rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &OrchestratorConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_routing(config)?;

        Ok(())
    }

    /// Routing entries may only name providers declared in the config
    fn validate_routing(&self, config: &OrchestratorConfig) -> Result<(), ValidationError> {
        let known: HashSet<&str> = config.providers.iter().map(|p| p.id.as_str()).collect();

        for (task, order) in &config.routing.priorities {
            for (j, id) in order.iter().enumerate() {
                if !known.contains(id.as_str()) {
                    return Err(ValidationError::new(
                        format!("routing.priorities.{}[{}]", task, j),
                        ValidationErrorKind::UnknownProvider { id: id.clone() },
                    )
                    .with_context("Routing may only reference declared providers"));
                }
            }
        }

        Ok(())
    }
}
