//! Interface manager: turns a provider name plus configuration into a
//! ready-to-use provider instance.
//!
//! Construction validates required settings and opens a lazy HTTP client;
//! it never touches the network.

use std::sync::Arc;

use tracing::debug;

use sciphi_core::config::{Config, ProvidersConfig};
use sciphi_core::error::ConfigError;
use sciphi_core::types::{ProviderKind, ProviderName};

use crate::registry::{find_by_name, lookup, Constructor, ProviderSpec};
use crate::traits::{LlmProvider, PassagePolicy, RagProvider, ScoreThreshold};

/// A constructed provider of either kind.
#[derive(Clone)]
pub enum ProviderInstance {
    Llm(Arc<dyn LlmProvider>),
    Rag(Arc<dyn RagProvider>),
}

impl ProviderInstance {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderInstance::Llm(_) => ProviderKind::Llm,
            ProviderInstance::Rag(_) => ProviderKind::Rag,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ProviderInstance::Llm(p) => p.display_name(),
            ProviderInstance::Rag(p) => p.display_name(),
        }
    }
}

impl std::fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("kind", &self.kind())
            .field("provider", &self.display_name())
            .finish()
    }
}

/// Look up `provider_name` in the registry and construct it from `providers`.
///
/// RAG providers get the default relevance policy.
pub fn get_interface_from_args(
    provider_name: &str,
    providers: &ProvidersConfig,
) -> Result<ProviderInstance, ConfigError> {
    let spec = lookup(provider_name)?;
    construct(spec, providers, Arc::new(ScoreThreshold::default()))
}

/// Construct the LLM provider named `provider_name`.
pub fn llm_from_args(
    provider_name: &str,
    providers: &ProvidersConfig,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    create_llm_provider(provider_name.parse()?, providers)
}

/// Construct the RAG provider named `provider_name` with the default relevance policy.
pub fn rag_from_args(
    provider_name: &str,
    providers: &ProvidersConfig,
) -> Result<Arc<dyn RagProvider>, ConfigError> {
    create_rag_provider(
        provider_name.parse()?,
        providers,
        Arc::new(ScoreThreshold::default()),
    )
}

/// Construct an LLM provider; a RAG name is rejected before any setting is checked.
pub fn create_llm_provider(
    name: ProviderName,
    providers: &ProvidersConfig,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    let spec = spec_for(name)?;
    match spec.constructor {
        Constructor::Llm(build) => {
            log_construction(spec, providers);
            build(spec, providers.get(name))
        }
        Constructor::Rag(_) => Err(ConfigError::KindMismatch {
            provider: name,
            expected: ProviderKind::Llm,
        }),
    }
}

/// Construct a RAG provider with the given relevance policy.
pub fn create_rag_provider(
    name: ProviderName,
    providers: &ProvidersConfig,
    policy: Arc<dyn PassagePolicy>,
) -> Result<Arc<dyn RagProvider>, ConfigError> {
    let spec = spec_for(name)?;
    match spec.constructor {
        Constructor::Rag(build) => {
            log_construction(spec, providers);
            build(spec, providers.get(name), policy)
        }
        Constructor::Llm(_) => Err(ConfigError::KindMismatch {
            provider: name,
            expected: ProviderKind::Rag,
        }),
    }
}

/// Everything a run needs: one LLM and, when retrieval is enabled, one RAG provider.
#[derive(Clone)]
pub struct RunProviders {
    pub llm: Arc<dyn LlmProvider>,
    pub rag: Option<Arc<dyn RagProvider>>,
}

/// Build the providers selected by `config`.
///
/// The RAG provider is only constructed (and only validated) when `rag.enabled`.
pub fn build_from_config(config: &Config) -> Result<RunProviders, ConfigError> {
    let llm = create_llm_provider(config.llm.provider, &config.providers)?;

    let rag = if config.rag.enabled {
        let policy = Arc::new(ScoreThreshold {
            min_score: config.rag.min_score,
        });
        Some(create_rag_provider(
            config.rag.provider,
            &config.providers,
            policy,
        )?)
    } else {
        None
    };

    Ok(RunProviders { llm, rag })
}

fn spec_for(name: ProviderName) -> Result<&'static ProviderSpec, ConfigError> {
    find_by_name(name).ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))
}

fn construct(
    spec: &'static ProviderSpec,
    providers: &ProvidersConfig,
    policy: Arc<dyn PassagePolicy>,
) -> Result<ProviderInstance, ConfigError> {
    log_construction(spec, providers);
    let config = providers.get(spec.name);
    match spec.constructor {
        Constructor::Llm(build) => build(spec, config).map(ProviderInstance::Llm),
        Constructor::Rag(build) => build(spec, config, policy).map(ProviderInstance::Rag),
    }
}

fn log_construction(spec: &ProviderSpec, providers: &ProvidersConfig) {
    debug!(
        provider = spec.display_name,
        kind = %spec.kind,
        api_base = providers.get(spec.name).api_base.as_deref().unwrap_or("default"),
        "Creating provider"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers() -> ProvidersConfig {
        let mut providers = ProvidersConfig::default();
        providers.openai.api_key = "sk-test".into();
        providers.anthropic.api_key = "sk-ant-test".into();
        providers.openrouter.api_key = "sk-or-test".into();
        providers.sciphi.api_key = "sciphi-test".into();
        providers.sciphi_wiki.api_key = "rag-key".into();
        providers.sciphi_wiki.api_base = Some("https://rag.example.com".into());
        providers.vllm.api_base = Some("http://localhost:8000/v1".into());
        providers
    }

    #[test]
    fn test_get_interface_for_every_registered_name() {
        let providers = providers();
        for name in ProviderName::ALL {
            let instance = get_interface_from_args(name.as_str(), &providers)
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(instance.kind(), name.kind());
        }
    }

    #[test]
    fn test_unknown_name_is_lookup_error() {
        let err = get_interface_from_args("not-a-provider", &providers()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(_)));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = get_interface_from_args("openrouter", &ProvidersConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting {
                provider: ProviderName::OpenRouter,
                ..
            }
        ));
    }

    #[test]
    fn test_llm_from_args() {
        let llm = llm_from_args("anthropic", &providers()).ok().unwrap();
        assert_eq!(llm.name(), ProviderName::Anthropic);
    }

    #[test]
    fn test_kind_mismatch() {
        // Rejected on kind even though the RAG settings are missing
        let err = llm_from_args("sciphi-wiki", &ProvidersConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigError::KindMismatch {
                expected: ProviderKind::Llm,
                ..
            }
        ));

        let err = rag_from_args("openai", &providers()).err().unwrap();
        assert!(err.to_string().contains("cannot be used as the RAG provider"));
    }

    #[test]
    fn test_build_from_config_without_rag() {
        let config = Config {
            providers: providers(),
            ..Default::default()
        };
        let run = build_from_config(&config).ok().unwrap();
        assert_eq!(run.llm.name(), ProviderName::OpenAi);
        assert!(run.rag.is_none());
    }

    #[test]
    fn test_build_from_config_with_rag() {
        let mut config = Config {
            providers: providers(),
            ..Default::default()
        };
        config.rag.enabled = true;
        let run = build_from_config(&config).ok().unwrap();
        assert_eq!(run.rag.unwrap().name(), ProviderName::SciPhiWiki);
    }

    #[test]
    fn test_rag_settings_only_checked_when_enabled() {
        let mut config = Config::default();
        config.providers.openai.api_key = "sk-test".into();
        assert!(build_from_config(&config).is_ok());

        config.rag.enabled = true;
        assert!(build_from_config(&config).is_err());
    }
}
