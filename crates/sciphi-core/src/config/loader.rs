//! Config loader: reads `~/.sciphi/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. Conventional provider variables (`OPENAI_API_KEY`, `RAG_API_BASE`, …),
//!    only where the file leaves a key or base URL empty
//! 3. JSON file at `~/.sciphi/config.json`
//! 4. Environment variables `SCIPHI_<SECTION>__<FIELD>` (override JSON)
//!
//! Only an absent default file falls back to defaults. A file that exists but
//! cannot be read or deserialized, or an explicit path that does not exist, is
//! an error.
//!
//! The environment is read here and nowhere else: the returned `Config` is the
//! single source of provider settings for the rest of the run.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;
use crate::error::ConfigLoadError;
use crate::types::ProviderName;

/// Environment naming for one provider:
/// `(name, SCIPHI_PROVIDERS__<SECTION>__*, conventional key var, conventional base var)`.
const PROVIDER_ENV: &[(ProviderName, &str, Option<&str>, Option<&str>)] = &[
    (ProviderName::OpenAi, "OPENAI", Some("OPENAI_API_KEY"), Some("OPENAI_API_BASE")),
    (ProviderName::Anthropic, "ANTHROPIC", Some("ANTHROPIC_API_KEY"), None),
    (ProviderName::OpenRouter, "OPENROUTER", Some("OPENROUTER_API_KEY"), None),
    (ProviderName::VLlm, "VLLM", Some("VLLM_API_KEY"), Some("VLLM_API_BASE")),
    (ProviderName::LlamaCpp, "LLAMACPP", None, Some("LLAMACPP_API_BASE")),
    (ProviderName::SciPhi, "SCIPHI", Some("SCIPHI_API_KEY"), Some("SCIPHI_API_BASE")),
    (ProviderName::SciPhiWiki, "SCIPHI_WIKI", Some("RAG_API_KEY"), Some("RAG_API_BASE")),
];

/// Conventional environment variable holding the API key for a provider, if any.
pub fn conventional_key_var(name: ProviderName) -> Option<&'static str> {
    PROVIDER_ENV
        .iter()
        .find(|(n, ..)| *n == name)
        .and_then(|(_, _, key, _)| *key)
}

/// Conventional environment variable holding the base URL for a provider, if any.
pub fn conventional_base_var(name: ProviderName) -> Option<&'static str> {
    PROVIDER_ENV
        .iter()
        .find(|(n, ..)| *n == name)
        .and_then(|(_, _, _, base)| *base)
}

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or `path`) + process env vars.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigLoadError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], resolving env vars through `lookup`.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            let path = get_config_path();
            if path.exists() {
                read_config_file(&path)?
            } else {
                info!("No config file found at {}, using defaults", path.display());
                Config::default()
            }
        }
    };
    Ok(apply_env_overrides(config, lookup))
}

/// Read and deserialize one config file, without env overrides.
fn read_config_file(path: &Path) -> Result<Config, ConfigLoadError> {
    debug!("Loading config from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigLoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|e| ConfigLoadError::Invalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// `lookup` resolves a variable name; `load_config` passes the process environment.
///
/// Supported overrides:
/// - `SCIPHI_LLM__PROVIDER`, `SCIPHI_LLM__MODEL`, `SCIPHI_LLM__MAX_TOKENS_TO_SAMPLE`,
///   `SCIPHI_LLM__TEMPERATURE`, `SCIPHI_LLM__TOP_P`, `SCIPHI_LLM__TOP_K`
/// - `SCIPHI_RAG__ENABLED`, `SCIPHI_RAG__PROVIDER`, `SCIPHI_RAG__TOP_K`,
///   `SCIPHI_RAG__MAX_CONTEXT`, `SCIPHI_RAG__MIN_SCORE`
/// - `SCIPHI_RETRY__MAX_ATTEMPTS`, `SCIPHI_RETRY__BASE_DELAY_MS`,
///   `SCIPHI_RETRY__MAX_DELAY_MS`, `SCIPHI_RETRY__JITTER`
/// - `SCIPHI_PROVIDERS__<NAME>__API_KEY` / `__API_BASE`
/// - Conventional fallbacks (`OPENAI_API_KEY`, `RAG_API_BASE`, …) for empty settings
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // LLM
    if let Some(val) = lookup("SCIPHI_LLM__PROVIDER") {
        match val.parse::<ProviderName>() {
            Ok(name) => config.llm.provider = name,
            Err(e) => warn!("Ignoring SCIPHI_LLM__PROVIDER: {}", e),
        }
    }
    if let Some(val) = lookup("SCIPHI_LLM__MODEL") {
        config.llm.generation.model = val;
    }
    if let Some(n) = lookup("SCIPHI_LLM__MAX_TOKENS_TO_SAMPLE").and_then(|v| v.parse().ok()) {
        config.llm.generation.max_tokens_to_sample = n;
    }
    if let Some(t) = lookup("SCIPHI_LLM__TEMPERATURE").and_then(|v| v.parse().ok()) {
        config.llm.generation.temperature = t;
    }
    if let Some(p) = lookup("SCIPHI_LLM__TOP_P").and_then(|v| v.parse().ok()) {
        config.llm.generation.top_p = Some(p);
    }
    if let Some(k) = lookup("SCIPHI_LLM__TOP_K").and_then(|v| v.parse().ok()) {
        config.llm.generation.top_k = Some(k);
    }

    // RAG
    if let Some(val) = lookup("SCIPHI_RAG__ENABLED") {
        config.rag.enabled = is_truthy(&val);
    }
    if let Some(val) = lookup("SCIPHI_RAG__PROVIDER") {
        match val.parse::<ProviderName>() {
            Ok(name) => config.rag.provider = name,
            Err(e) => warn!("Ignoring SCIPHI_RAG__PROVIDER: {}", e),
        }
    }
    if let Some(k) = lookup("SCIPHI_RAG__TOP_K").and_then(|v| v.parse().ok()) {
        config.rag.top_k = k;
    }
    if let Some(n) = lookup("SCIPHI_RAG__MAX_CONTEXT").and_then(|v| v.parse().ok()) {
        config.rag.max_context = n;
    }
    if let Some(s) = lookup("SCIPHI_RAG__MIN_SCORE").and_then(|v| v.parse().ok()) {
        config.rag.min_score = Some(s);
    }

    // Retry
    if let Some(n) = lookup("SCIPHI_RETRY__MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
        config.retry.max_attempts = n;
    }
    if let Some(ms) = lookup("SCIPHI_RETRY__BASE_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.retry.base_delay_ms = ms;
    }
    if let Some(ms) = lookup("SCIPHI_RETRY__MAX_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.retry.max_delay_ms = ms;
    }
    if let Some(val) = lookup("SCIPHI_RETRY__JITTER") {
        config.retry.jitter = is_truthy(&val);
    }

    // Providers
    for (name, section, key_var, base_var) in PROVIDER_ENV {
        let provider = config.providers.get_mut(*name);

        if provider.api_key.is_empty() {
            if let Some(val) = key_var.and_then(&lookup) {
                provider.api_key = val;
            }
        }
        if provider.api_base.is_none() {
            if let Some(val) = base_var.and_then(&lookup) {
                provider.api_base = Some(val);
            }
        }

        if let Some(val) = lookup(&format!("SCIPHI_PROVIDERS__{section}__API_KEY")) {
            provider.api_key = val;
        }
        if let Some(val) = lookup(&format!("SCIPHI_PROVIDERS__{section}__API_BASE")) {
            provider.api_base = Some(val);
        }
    }

    config
}

fn is_truthy(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
