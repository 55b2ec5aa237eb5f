//! Provider error types and retryability classification

use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Low-level error codes treated as transient network failures
const TRANSIENT_CODES: &[&str] = &[
    "ECONNRESET",
    "ECONNREFUSED",
    "ECONNABORTED",
    "ETIMEDOUT",
    "ENOTFOUND",
    "EAI_AGAIN",
    "EPIPE",
];

/// Errors that can occur when calling a provider adapter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Provider answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection reset, refused, or DNS failure
    #[error("Network error: {0}")]
    Network(String),

    /// Call did not finish in time
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Provider has no credentials configured
    #[error("Provider '{0}' is not configured")]
    NotConfigured(String),

    /// Provider answered but the body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Anything else, with an optional machine-readable code
    #[error("{}", render_other(.code, .message))]
    Other {
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    /// Shorthand for an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for an uncategorized error with a code
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Shorthand for an uncategorized error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: None,
            message: message.into(),
        }
    }

    /// HTTP-style status, when there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same provider may succeed.
    ///
    /// Retryable: HTTP 429, any 5xx, network and timeout failures, transient
    /// socket/DNS codes, and any message mentioning "timeout" or "rate limit".
    pub fn is_retryable(&self) -> bool {
        let structural = match self {
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Other {
                code: Some(code), ..
            } => TRANSIENT_CODES
                .iter()
                .any(|transient| code.eq_ignore_ascii_case(transient)),
            Self::NotConfigured(_) => return false,
            _ => false,
        };
        structural || message_suggests_transient(&self.to_string())
    }

    /// One-line summary suitable for health records
    pub fn summary(&self) -> String {
        let text = self.to_string();
        match text.char_indices().nth(200) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text,
        }
    }
}

fn render_other(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    }
}

fn message_suggests_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout") || lower.contains("rate limit")
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(0)
        } else if err.is_connect() {
            ProviderError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            ProviderError::http(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(ProviderError::http(503, "busy").to_string(), "HTTP 503: busy");
        assert_eq!(
            ProviderError::coded("ECONNRESET", "socket hang up").to_string(),
            "[ECONNRESET] socket hang up"
        );
        assert_eq!(ProviderError::other("plain").to_string(), "plain");
    }

    #[test]
    fn test_not_configured_is_never_retried() {
        let err = ProviderError::NotConfigured("rate limit".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_summary_is_bounded() {
        let err = ProviderError::other("x".repeat(500));
        assert!(err.summary().chars().count() <= 203);
    }
}
