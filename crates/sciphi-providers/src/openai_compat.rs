//! LLM provider for OpenAI-compatible `/chat/completions` APIs.
//!
//! Covers: OpenAI, OpenRouter, SciPhi hosted models, and self-hosted vLLM.
//! The prompt is sent as a single user message.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sciphi_core::config::ProviderConfig;
use sciphi_core::error::ConfigError;
use sciphi_core::types::{GenerationSettings, ProviderName};

use crate::error::CompletionError;
use crate::http::{build_client, post_json, secret_header};
use crate::registry::{resolve_api_base, resolve_api_key, ProviderSpec};
use crate::traits::{strip_stop_markers, LlmProvider};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────
// OpenAiCompatProvider
// ─────────────────────────────────────────────

/// An LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct OpenAiCompatProvider {
    /// HTTP client (shared, connection-pooled), with auth and extra headers baked in.
    client: reqwest::Client,
    /// API base URL without trailing slash (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("api_base", &self.api_base)
            .field("provider", &self.spec.display_name)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider from its registry spec and the user's connection settings.
    ///
    /// Validates the API key and base URL; makes no network call.
    pub fn new(spec: &'static ProviderSpec, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_base = resolve_api_base(spec, config)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = resolve_api_key(spec, config)? {
            headers.insert(AUTHORIZATION, secret_header(spec, &format!("Bearer {}", key))?);
        }
        let client = build_client(spec, config, headers)?;

        Ok(OpenAiCompatProvider {
            client,
            api_base,
            spec,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// Registry constructor.
pub fn build(
    spec: &'static ProviderSpec,
    config: &ProviderConfig,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    Ok(Arc::new(OpenAiCompatProvider::new(spec, config)?))
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, CompletionError> {
        debug!(
            provider = self.spec.display_name,
            model = %settings.model,
            prompt_chars = prompt.len(),
            "Calling LLM"
        );

        let request_body = ChatCompletionRequest {
            model: &settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: settings.max_tokens_to_sample,
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k.filter(|_| self.spec.supports_top_k),
            stop: Some(settings.stop_sequences.as_slice()).filter(|s| !s.is_empty()),
        };

        let response: ChatCompletionResponse = post_json(
            self.client.post(self.completions_url()),
            &request_body,
            self.spec.display_name,
        )
        .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".into()))?;

        debug!(
            provider = self.spec.display_name,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );

        let content = choice
            .message
            .content
            .ok_or_else(|| CompletionError::MalformedResponse("choice has no content".into()))?;

        Ok(strip_stop_markers(&content, &settings.stop_sequences))
    }

    fn name(&self) -> ProviderName {
        self.spec.name
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
