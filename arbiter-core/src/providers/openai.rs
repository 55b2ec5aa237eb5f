//! OpenAI provider adapter
//!
//! Speaks the chat completions wire format. Any OpenAI-compatible endpoint
//! can be targeted by overriding the base URL and id.

use crate::config::SecretString;
use crate::http::HttpClient;
use crate::protocol::types::{Request, TokenUsage};
use crate::providers::adapter::{AdapterReply, ProviderAdapter};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat completions adapter
pub struct OpenAIAdapter {
    id: String,
    api_key: SecretString,
    base_url: String,
    model: String,
    http: HttpClient,
}

impl OpenAIAdapter {
    /// Create a new adapter with default id, endpoint and model
    pub fn new(api_key: impl Into<SecretString>, http: HttpClient) -> Self {
        Self {
            id: "openai".to_string(),
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

    fn build_body(&self, request: &Request) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.wants_json().then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
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

        let url = format!("{}/chat/completions", self.base_url);
        let headers = [(
            "Authorization",
            format!("Bearer {}", self.api_key.expose_secret()),
        )];
        let body = self.build_body(request);

        let response: ChatCompletionResponse =
            self.http.post_json(&self.id, &url, &headers, &body).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("response has no content".to_string()))?;

        Ok(AdapterReply {
            content,
            model: response.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TaskType;

    fn adapter() -> OpenAIAdapter {
        OpenAIAdapter::new("sk-test", HttpClient::new().unwrap())
    }

    #[test]
    fn test_body_includes_system_and_json_mode() {
        let request = Request::new("classify this", TaskType::Categorization)
            .with_system_prompt("you classify")
            .with_json_mode(true)
            .with_max_tokens(64);
        let body = serde_json::to_value(adapter().build_body(&request)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "classify this");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 64);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let adapter = adapter().with_base_url("http://localhost:8080/v1/");
        assert_eq!(adapter.base_url, "http://localhost:8080/v1");
    }
}
