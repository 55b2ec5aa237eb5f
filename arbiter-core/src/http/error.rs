//! HTTP error mapping utilities

use crate::providers::error::ProviderError;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

/// Map an HTTP status code and response body to a ProviderError
///
/// The status is always preserved so the retry classifier can see it; the
/// message is taken from the provider's error envelope when one is present.
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> ProviderError {
    let message = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .or(body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("HTTP error")
                .to_string()
        });

    ProviderError::http(
        status.as_u16(),
        format!("{} [request_id: {}]", message, request_id),
    )
}

/// Extract an error message from common JSON error envelopes
fn extract_error_message(json: &Value) -> Option<String> {
    // OpenAI / Anthropic: { "error": { "message": "...", "type": "..." } }
    // Gemini: { "error": { "code": 429, "message": "...", "status": "RESOURCE_EXHAUSTED" } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(message.to_string());
        }
        if let Some(message) = error.as_str() {
            return Some(message.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
