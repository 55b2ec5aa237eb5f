//! Anthropic provider adapter
//!
//! Implements the messages API. System prompts go in the top-level
//! `system` field; there is no native JSON mode, so JSON requests append an
//! instruction to the system prompt instead.

use crate::config::SecretString;
use crate::http::HttpClient;
use crate::protocol::types::{Request, TokenUsage};
use crate::providers::adapter::{AdapterReply, ProviderAdapter};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const JSON_INSTRUCTION: &str = "Respond with valid JSON only, without any surrounding prose.";

/// Anthropic messages adapter
pub struct AnthropicAdapter {
    id: String,
    api_key: SecretString,
    base_url: String,
    model: String,
    http: HttpClient,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<SecretString>, http: HttpClient) -> Self {
        Self {
            id: "anthropic".to_string(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_body(&self, request: &Request) -> MessagesRequest {
        let system = match (request.system_prompt.as_deref(), request.wants_json()) {
            (Some(s), true) if !s.is_empty() => Some(format!("{}\n\n{}", s, JSON_INSTRUCTION)),
            (_, true) => Some(JSON_INSTRUCTION.to_string()),
            (Some(s), false) if !s.is_empty() => Some(s.to_string()),
            _ => None,
        };

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &Request) -> ProviderResult<AdapterReply> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(self.id.clone()));
        }

        let url = format!("{}/messages", self.base_url);
        let headers = [
            ("x-api-key", self.api_key.expose_secret().to_string()),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let body = self.build_body(request);

        let response: MessagesResponse =
            self.http.post_json(&self.id, &url, &headers, &body).await?;

        let content = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "response has no text content".to_string(),
            ));
        }

        Ok(AdapterReply {
            content,
            model: response.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: response
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TaskType;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new("sk-ant-test", HttpClient::new().unwrap())
    }

    #[test]
    fn test_json_mode_extends_system_prompt() {
        let request = Request::new("q", TaskType::Analysis)
            .with_system_prompt("analyst")
            .with_json_mode(true);
        let body = adapter().build_body(&request);
        let system = body.system.unwrap();
        assert!(system.starts_with("analyst"));
        assert!(system.ends_with(JSON_INSTRUCTION));
    }

    #[test]
    fn test_max_tokens_defaults() {
        let body = adapter().build_body(&Request::new("q", TaskType::General));
        assert_eq!(body.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(body.system.is_none());
    }
}
