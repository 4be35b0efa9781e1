//! Provider registry: static specs for every supported LLM and RAG backend.
//!
//! Each `ProviderSpec` describes how to connect to a provider: its default
//! API base, which settings it insists on, its sampling quirks, and the
//! constructor that builds it. The set is closed: adding a backend means
//! adding an entry here.

use std::sync::Arc;

use sciphi_core::config::{conventional_base_var, conventional_key_var, ProviderConfig};
use sciphi_core::error::ConfigError;
use sciphi_core::types::{ProviderKind, ProviderName};

use crate::traits::{LlmProvider, PassagePolicy, RagProvider};

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one provider
// ─────────────────────────────────────────────

/// Builds an LLM provider from its spec and connection settings.
pub type LlmConstructor =
    fn(&'static ProviderSpec, &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ConfigError>;

/// Builds a RAG provider from its spec, connection settings and relevance policy.
pub type RagConstructor = fn(
    &'static ProviderSpec,
    &ProviderConfig,
    Arc<dyn PassagePolicy>,
) -> Result<Arc<dyn RagProvider>, ConfigError>;

/// Constructor tagged with the kind of provider it produces.
#[derive(Clone, Copy)]
pub enum Constructor {
    Llm(LlmConstructor),
    Rag(RagConstructor),
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constructor::Llm(_) => f.write_str("Constructor::Llm"),
            Constructor::Rag(_) => f.write_str("Constructor::Rag"),
        }
    }
}

/// Static specification describing one provider.
#[derive(Debug)]
pub struct ProviderSpec {
    /// Registry identifier (e.g. `ProviderName::OpenRouter`).
    pub name: ProviderName,
    pub kind: ProviderKind,
    /// Human-readable name for logs. E.g. `"OpenRouter"`.
    pub display_name: &'static str,
    /// API base used when the config does not set one.
    pub default_api_base: Option<&'static str>,
    /// Construction fails without an API key.
    pub requires_api_key: bool,
    /// Construction fails without an explicit base URL (self-hosted backends).
    pub requires_api_base: bool,
    /// Whether the backend accepts a `top_k` sampling parameter.
    pub supports_top_k: bool,
    pub constructor: Constructor,
}

// ─────────────────────────────────────────────
// All providers
// ─────────────────────────────────────────────

/// Complete list of supported provider specifications.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: ProviderName::OpenAi,
        kind: ProviderKind::Llm,
        display_name: "OpenAI",
        default_api_base: Some("https://api.openai.com/v1"),
        requires_api_key: true,
        requires_api_base: false,
        supports_top_k: false,
        constructor: Constructor::Llm(crate::openai_compat::build),
    },
    ProviderSpec {
        name: ProviderName::Anthropic,
        kind: ProviderKind::Llm,
        display_name: "Anthropic",
        default_api_base: Some("https://api.anthropic.com/v1"),
        requires_api_key: true,
        requires_api_base: false,
        supports_top_k: true,
        constructor: Constructor::Llm(crate::anthropic::build),
    },
    // Gateway, OpenAI-compatible; forwards top_k to the routed model
    ProviderSpec {
        name: ProviderName::OpenRouter,
        kind: ProviderKind::Llm,
        display_name: "OpenRouter",
        default_api_base: Some("https://openrouter.ai/api/v1"),
        requires_api_key: true,
        requires_api_base: false,
        supports_top_k: true,
        constructor: Constructor::Llm(crate::openai_compat::build),
    },
    // Self-hosted; key is optional (vLLM only checks it when started with --api-key)
    ProviderSpec {
        name: ProviderName::VLlm,
        kind: ProviderKind::Llm,
        display_name: "vLLM",
        default_api_base: None,
        requires_api_key: false,
        requires_api_base: true,
        supports_top_k: true,
        constructor: Constructor::Llm(crate::openai_compat::build),
    },
    ProviderSpec {
        name: ProviderName::LlamaCpp,
        kind: ProviderKind::Llm,
        display_name: "llama.cpp",
        default_api_base: Some("http://127.0.0.1:8080"),
        requires_api_key: false,
        requires_api_base: false,
        supports_top_k: true,
        constructor: Constructor::Llm(crate::llamacpp::build),
    },
    ProviderSpec {
        name: ProviderName::SciPhi,
        kind: ProviderKind::Llm,
        display_name: "SciPhi",
        default_api_base: Some("https://api.sciphi.ai/v1"),
        requires_api_key: true,
        requires_api_base: false,
        supports_top_k: false,
        constructor: Constructor::Llm(crate::openai_compat::build),
    },
    ProviderSpec {
        name: ProviderName::SciPhiWiki,
        kind: ProviderKind::Rag,
        display_name: "SciPhi Wiki",
        default_api_base: None,
        requires_api_key: true,
        requires_api_base: true,
        supports_top_k: false,
        constructor: Constructor::Rag(crate::sciphi_wiki::build),
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider spec by its typed name.
pub fn find_by_name(name: ProviderName) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|s| s.name == name)
}

/// Find a provider spec by a user-supplied name (`"openai"`, `"sciphi-wiki"`, …).
pub fn lookup(name: &str) -> Result<&'static ProviderSpec, ConfigError> {
    let parsed: ProviderName = name.parse()?;
    find_by_name(parsed).ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))
}

// ─────────────────────────────────────────────
// Setting validation
// ─────────────────────────────────────────────

/// Resolve the API base URL: config > spec default.
///
/// Fails when the spec requires a base URL and none is configured.
pub fn resolve_api_base(
    spec: &ProviderSpec,
    config: &ProviderConfig,
) -> Result<String, ConfigError> {
    let configured = config
        .api_base
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let base = match configured {
        Some(base) => base,
        None if spec.requires_api_base => {
            return Err(missing(spec.name, "an API base URL", base_hint(spec.name)))
        }
        None => spec.default_api_base.ok_or_else(|| {
            missing(spec.name, "an API base URL", base_hint(spec.name))
        })?,
    };

    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::InvalidSetting {
            provider: spec.name,
            setting: "API base URL",
            reason: format!("'{}' is not an http(s) URL", base),
        });
    }

    Ok(base.trim_end_matches('/').to_string())
}

/// Return the configured API key, failing if the spec requires one and it is empty.
pub fn resolve_api_key(
    spec: &ProviderSpec,
    config: &ProviderConfig,
) -> Result<Option<String>, ConfigError> {
    let key = config.api_key.trim();
    if key.is_empty() {
        if spec.requires_api_key {
            return Err(missing(spec.name, "an API key", key_hint(spec.name)));
        }
        return Ok(None);
    }
    Ok(Some(key.to_string()))
}

fn missing(provider: ProviderName, setting: &'static str, hint: String) -> ConfigError {
    ConfigError::MissingSetting {
        provider,
        setting,
        hint,
    }
}

/// Env var name as the loader spells it: `SCIPHI_PROVIDERS__SCIPHI_WIKI__API_KEY`.
fn prefixed_var(name: ProviderName, field: &str) -> String {
    format!(
        "SCIPHI_PROVIDERS__{}__{}",
        name.as_str().replace('-', "_").to_uppercase(),
        field
    )
}

fn key_hint(name: ProviderName) -> String {
    match conventional_key_var(name) {
        Some(var) => format!("{} or {}", var, prefixed_var(name, "API_KEY")),
        None => prefixed_var(name, "API_KEY"),
    }
}

fn base_hint(name: ProviderName) -> String {
    match conventional_base_var(name) {
        Some(var) => format!("{} or {}", var, prefixed_var(name, "API_BASE")),
        None => prefixed_var(name, "API_BASE"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
