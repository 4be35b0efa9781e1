//! LLM provider for the Anthropic Messages API (`/messages`).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sciphi_core::config::ProviderConfig;
use sciphi_core::error::ConfigError;
use sciphi_core::types::{GenerationSettings, ProviderName};

use crate::error::CompletionError;
use crate::http::{build_client, post_json, secret_header};
use crate::registry::{resolve_api_base, resolve_api_key, ProviderSpec};
use crate::traits::{strip_stop_markers, LlmProvider};

/// Messages API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Claude models over the native Messages API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_base: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(spec: &'static ProviderSpec, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_base = resolve_api_base(spec, config)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = resolve_api_key(spec, config)? {
            headers.insert(HeaderName::from_static("x-api-key"), secret_header(spec, &key)?);
        }
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        let client = build_client(spec, config, headers)?;

        Ok(AnthropicProvider {
            client,
            api_base,
            spec,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_base)
    }
}

/// Registry constructor.
pub fn build(
    spec: &'static ProviderSpec,
    config: &ProviderConfig,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    Ok(Arc::new(AnthropicProvider::new(spec, config)?))
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
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

        let request_body = MessagesRequest {
            model: &settings.model,
            max_tokens: settings.max_tokens_to_sample,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            stop_sequences: Some(settings.stop_sequences.as_slice()).filter(|s| !s.is_empty()),
        };

        let response: MessagesResponse = post_json(
            self.client.post(self.messages_url()),
            &request_body,
            self.spec.display_name,
        )
        .await?;

        debug!(
            provider = self.spec.display_name,
            stop_reason = response.stop_reason.as_deref().unwrap_or("?"),
            blocks = response.content.len(),
            "LLM response received"
        );

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(CompletionError::MalformedResponse(
                "response has no text content".into(),
            ));
        }
        Ok(strip_stop_markers(&text, &settings.stop_sequences))
    }

    fn name(&self) -> ProviderName {
        self.spec.name
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}
