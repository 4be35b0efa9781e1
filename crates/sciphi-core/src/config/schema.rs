//! Configuration schema: one explicit struct built at process start.
//!
//! Hierarchy: `Config` → `LlmConfig`, `RagConfig`, `RetryConfig`, `ProvidersConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{GenerationSettings, ProviderName};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.sciphi/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub retry: RetryConfig,
    pub providers: ProvidersConfig,
}

// ─────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────

/// Which LLM provider to build, and the settings sent with every call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    pub provider: ProviderName,
    #[serde(flatten)]
    pub generation: GenerationSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderName::OpenAi,
            generation: GenerationSettings::default(),
        }
    }
}

// ─────────────────────────────────────────────
// RAG
// ─────────────────────────────────────────────

/// Where the retrieval query comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RagQuery {
    /// Use the templated prompt as the query.
    Prompt,
    /// Use the named record variable as the query.
    Variable(String),
}

/// Retrieval settings. Disabled by default.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagConfig {
    pub enabled: bool,
    pub provider: ProviderName,
    /// Number of passages to keep.
    pub top_k: usize,
    /// Maximum characters of grounding text appended to a prompt.
    pub max_context: usize,
    /// Passages scoring below this are dropped. `None` keeps everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub query: RagQuery,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: ProviderName::SciPhiWiki,
            top_k: 10,
            max_context: 2048,
            min_score: None,
            query: RagQuery::Prompt,
        }
    }
}

// ─────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────

/// Retry budget and backoff shape for outbound calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Connection settings for a single provider (API key, base URL, headers, timeout).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            extra_headers: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    /// Whether this provider has an API key.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per `ProviderName`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub openrouter: ProviderConfig,
    #[serde(default)]
    pub vllm: ProviderConfig,
    #[serde(default)]
    pub llamacpp: ProviderConfig,
    #[serde(default)]
    pub sciphi: ProviderConfig,
    #[serde(default)]
    pub sciphi_wiki: ProviderConfig,
}

impl ProvidersConfig {
    /// Get the config for a provider.
    pub fn get(&self, name: ProviderName) -> &ProviderConfig {
        match name {
            ProviderName::OpenAi => &self.openai,
            ProviderName::Anthropic => &self.anthropic,
            ProviderName::OpenRouter => &self.openrouter,
            ProviderName::VLlm => &self.vllm,
            ProviderName::LlamaCpp => &self.llamacpp,
            ProviderName::SciPhi => &self.sciphi,
            ProviderName::SciPhiWiki => &self.sciphi_wiki,
        }
    }

    pub fn get_mut(&mut self, name: ProviderName) -> &mut ProviderConfig {
        match name {
            ProviderName::OpenAi => &mut self.openai,
            ProviderName::Anthropic => &mut self.anthropic,
            ProviderName::OpenRouter => &mut self.openrouter,
            ProviderName::VLlm => &mut self.vllm,
            ProviderName::LlamaCpp => &mut self.llamacpp,
            ProviderName::SciPhi => &mut self.sciphi,
            ProviderName::SciPhiWiki => &mut self.sciphi_wiki,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
