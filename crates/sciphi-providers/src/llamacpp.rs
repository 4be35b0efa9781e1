//! LLM provider for a self-hosted llama.cpp server (`/completion`).
//!
//! The server has a single model loaded, so `settings.model` is only logged.

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

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    stop: &'a [String],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
    #[serde(default)]
    tokens_predicted: Option<u64>,
}

pub struct LlamaCppProvider {
    client: reqwest::Client,
    api_base: String,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for LlamaCppProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlamaCppProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl LlamaCppProvider {
    pub fn new(spec: &'static ProviderSpec, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_base = resolve_api_base(spec, config)?;

        // Only sent when the server was started with --api-key
        let mut headers = HeaderMap::new();
        if let Some(key) = resolve_api_key(spec, config)? {
            headers.insert(AUTHORIZATION, secret_header(spec, &format!("Bearer {}", key))?);
        }
        let client = build_client(spec, config, headers)?;

        Ok(LlamaCppProvider {
            client,
            api_base,
            spec,
        })
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.api_base)
    }
}

/// Registry constructor.
pub fn build(
    spec: &'static ProviderSpec,
    config: &ProviderConfig,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    Ok(Arc::new(LlamaCppProvider::new(spec, config)?))
}

#[async_trait]
impl LlmProvider for LlamaCppProvider {
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

        let request_body = CompletionRequest {
            prompt,
            n_predict: settings.max_tokens_to_sample,
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            stop: &settings.stop_sequences,
            stream: false,
        };

        let response: CompletionResponse = post_json(
            self.client.post(self.completion_url()),
            &request_body,
            self.spec.display_name,
        )
        .await?;

        debug!(
            provider = self.spec.display_name,
            tokens = response.tokens_predicted.unwrap_or(0),
            "LLM response received"
        );

        Ok(strip_stop_markers(&response.content, &settings.stop_sequences))
    }

    fn name(&self) -> ProviderName {
        self.spec.name
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}
