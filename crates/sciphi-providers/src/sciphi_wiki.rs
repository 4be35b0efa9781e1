//! RAG provider for the SciPhi Wiki search service.
//!
//! `POST {base}/search` with `{"queries": [..], "top_k": k}` returns one
//! passage list per query. Passages go through the configured
//! [`PassagePolicy`] before being rendered into a grounding block.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde::Serialize;
use tracing::debug;

use sciphi_core::config::ProviderConfig;
use sciphi_core::error::ConfigError;
use sciphi_core::types::ProviderName;

use crate::error::CompletionError;
use crate::http::{build_client, post_json, secret_header};
use crate::registry::{resolve_api_base, resolve_api_key, ProviderSpec};
use crate::traits::{render_grounding, Passage, PassagePolicy, RagProvider};

#[derive(Serialize)]
struct SearchRequest<'a> {
    queries: [&'a str; 1],
    top_k: usize,
}

pub struct SciPhiWikiProvider {
    client: reqwest::Client,
    api_base: String,
    policy: Arc<dyn PassagePolicy>,
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for SciPhiWikiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SciPhiWikiProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SciPhiWikiProvider {
    pub fn new(
        spec: &'static ProviderSpec,
        config: &ProviderConfig,
        policy: Arc<dyn PassagePolicy>,
    ) -> Result<Self, ConfigError> {
        let api_base = resolve_api_base(spec, config)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = resolve_api_key(spec, config)? {
            headers.insert(AUTHORIZATION, secret_header(spec, &format!("Bearer {}", key))?);
        }
        let client = build_client(spec, config, headers)?;

        Ok(SciPhiWikiProvider {
            client,
            api_base,
            policy,
            spec,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.api_base)
    }
}

/// Registry constructor.
pub fn build(
    spec: &'static ProviderSpec,
    config: &ProviderConfig,
    policy: Arc<dyn PassagePolicy>,
) -> Result<Arc<dyn RagProvider>, ConfigError> {
    Ok(Arc::new(SciPhiWikiProvider::new(spec, config, policy)?))
}

#[async_trait]
impl RagProvider for SciPhiWikiProvider {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        max_context: usize,
    ) -> Result<Option<String>, CompletionError> {
        if top_k == 0 || max_context == 0 || query.trim().is_empty() {
            return Ok(None);
        }

        let request_body = SearchRequest {
            queries: [query],
            top_k,
        };
        let mut results: Vec<Vec<Passage>> = post_json(
            self.client.post(self.search_url()),
            &request_body,
            self.spec.display_name,
        )
        .await?;

        let passages = if results.is_empty() {
            Vec::new()
        } else {
            results.swap_remove(0)
        };
        let found = passages.len();
        let selected = self.policy.select(passages, top_k);

        debug!(
            provider = self.spec.display_name,
            found,
            selected = selected.len(),
            "Passages retrieved"
        );

        Ok(render_grounding(&selected, max_context))
    }

    fn name(&self) -> ProviderName {
        self.spec.name
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}
