//! Google Gemini provider adapter (generateContent)

use crate::config::SecretString;
use crate::http::HttpClient;
use crate::protocol::types::{Request, TokenUsage};
use crate::providers::adapter::{AdapterReply, ProviderAdapter};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini generateContent adapter
pub struct GeminiAdapter {
    id: String,
    api_key: SecretString,
    base_url: String,
    model: String,
    http: HttpClient,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<SecretString>, http: HttpClient) -> Self {
        Self {
            id: "gemini".to_string(),
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

    fn build_body(&self, request: &Request) -> GenerateContentRequest {
        let system_instruction = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| WireContent {
                role: None,
                parts: vec![Part { text: s.to_string() }],
            });

        GenerateContentRequest {
            contents: vec![WireContent {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
                response_mime_type: request
                    .wants_json()
                    .then(|| "application/json".to_string()),
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let headers = [("x-goog-api-key", self.api_key.expose_secret().to_string())];
        let body = self.build_body(request);

        let response: GenerateContentResponse =
            self.http.post_json(&self.id, &url, &headers, &body).await?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("response has no candidates".to_string()))?;

        Ok(AdapterReply {
            content,
            model: response.model_version.unwrap_or_else(|| self.model.clone()),
            tokens_used: response
                .usage_metadata
                .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count)),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
