//! Core types for SciPhi: provider identity, generation settings, records and results.
//!
//! Everything that crosses a crate boundary lives here so that the provider
//! layer and the pipeline agree on one vocabulary.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ─────────────────────────────────────────────
// Provider identity
// ─────────────────────────────────────────────

/// Which side of the pipeline a provider serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Turns a prompt into generated text.
    Llm,
    /// Retrieves grounding passages for a query.
    Rag,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Llm => f.write_str("LLM"),
            ProviderKind::Rag => f.write_str("RAG"),
        }
    }
}

/// Identifier of every supported backend.
///
/// The set is closed: adding a backend means adding a variant here and a
/// spec in the provider registry. Deserialization goes through [`FromStr`], so
/// a misspelt name in a config file is reported as an unknown provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ProviderName {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "vllm")]
    VLlm,
    #[serde(rename = "llamacpp")]
    LlamaCpp,
    #[serde(rename = "sciphi")]
    SciPhi,
    #[serde(rename = "sciphi-wiki")]
    SciPhiWiki,
}

impl ProviderName {
    /// All identifiers, in registry order.
    pub const ALL: [ProviderName; 7] = [
        ProviderName::OpenAi,
        ProviderName::Anthropic,
        ProviderName::OpenRouter,
        ProviderName::VLlm,
        ProviderName::LlamaCpp,
        ProviderName::SciPhi,
        ProviderName::SciPhiWiki,
    ];

    /// Wire name used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::OpenAi => "openai",
            ProviderName::Anthropic => "anthropic",
            ProviderName::OpenRouter => "openrouter",
            ProviderName::VLlm => "vllm",
            ProviderName::LlamaCpp => "llamacpp",
            ProviderName::SciPhi => "sciphi",
            ProviderName::SciPhiWiki => "sciphi-wiki",
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderName::SciPhiWiki => ProviderKind::Rag,
            _ => ProviderKind::Llm,
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProviderName::ALL
            .into_iter()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for ProviderName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ─────────────────────────────────────────────
// Generation settings
// ─────────────────────────────────────────────

/// Per-call sampling options understood by every LLM provider.
///
/// Each provider translates these into its backend's native request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// Model identifier sent to the backend.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens_to_sample: u32,
    /// Sampling randomness; 0 is deterministic.
    pub temperature: f64,
    /// Top-k truncation, only sent to backends that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Nucleus sampling truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Strings that terminate generation early.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens_to_sample: 256,
            temperature: 0.7,
            top_k: None,
            top_p: Some(1.0),
            stop_sequences: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────

/// One unit of input: an identifier plus the variables a template is filled with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub variables: HashMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variables: HashMap::new(),
        }
    }

    /// Builder-style variable insertion.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

// ─────────────────────────────────────────────
// Request lifecycle and results
// ─────────────────────────────────────────────

/// States a generation request moves through.
///
/// `Pending → Templated → (Retrieved) → Submitted → Parsed → Done`, with
/// `Failed` as the only other terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Templated,
    Retrieved,
    Submitted,
    Parsed,
    Done,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Pending => "pending",
            RequestState::Templated => "templated",
            RequestState::Retrieved => "retrieved",
            RequestState::Submitted => "submitted",
            RequestState::Parsed => "parsed",
            RequestState::Done => "done",
            RequestState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome flag written with every result line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Done,
    Failed,
}

/// One line of pipeline output. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Identifier of the source record.
    pub record_id: String,
    pub status: GenerationStatus,
    /// Parsed output (present when `status == Done`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Failure description (present when `status == Failed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage at which the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<RequestState>,
    /// Number of LLM calls made for this record.
    pub attempts: u32,
    pub provider: ProviderName,
    pub model: String,
    /// Whether retrieved context was appended to the prompt.
    pub grounded: bool,
    pub timestamp: DateTime<Utc>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Done
    }
}

/// Totals reported at the end of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub runtime_secs: f64,
}

impl RunSummary {
    /// Account for one written result.
    pub fn record(&mut self, result: &GenerationResult) {
        self.total += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_parse() {
        assert_eq!("openai".parse::<ProviderName>().unwrap(), ProviderName::OpenAi);
        assert_eq!("  vLLM ".parse::<ProviderName>().unwrap(), ProviderName::VLlm);
        assert_eq!(
            "sciphi-wiki".parse::<ProviderName>().unwrap(),
            ProviderName::SciPhiWiki
        );
    }

    #[test]
    fn test_provider_name_unknown() {
        let err = "huggingface".parse::<ProviderName>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(ref n) if n == "huggingface"));
    }

    #[test]
    fn test_provider_name_deserialize() {
        let name: ProviderName = serde_json::from_str("\"Anthropic\"").unwrap();
        assert_eq!(name, ProviderName::Anthropic);

        let err = serde_json::from_str::<ProviderName>("\"antrhopic\"").unwrap_err();
        assert!(err.to_string().contains("unknown provider 'antrhopic'"));
    }

    #[test]
    fn test_provider_name_display_matches_serde() {
        for name in ProviderName::ALL {
            let json = serde_json::to_value(name).unwrap();
            assert_eq!(json, serde_json::json!(name.to_string()));
            assert_eq!(name.as_str().parse::<ProviderName>().unwrap(), name);
        }
    }

    #[test]
    fn test_provider_kind() {
        assert_eq!(ProviderName::SciPhiWiki.kind(), ProviderKind::Rag);
        assert_eq!(ProviderName::LlamaCpp.kind(), ProviderKind::Llm);
        let rag_count = ProviderName::ALL
            .iter()
            .filter(|n| n.kind() == ProviderKind::Rag)
            .count();
        assert_eq!(rag_count, 1);
    }

    #[test]
    fn test_generation_settings_defaults() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.max_tokens_to_sample, 256);
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.top_p, Some(1.0));
        assert!(settings.top_k.is_none());
    }

    #[test]
    fn test_generation_settings_camel_case() {
        let json = serde_json::json!({
            "model": "claude-2",
            "maxTokensToSample": 1024,
            "stopSequences": ["\n\nHuman:"]
        });
        let settings: GenerationSettings = serde_json::from_value(json).unwrap();
        assert_eq!(settings.model, "claude-2");
        assert_eq!(settings.max_tokens_to_sample, 1024);
        assert_eq!(settings.stop_sequences, vec!["\n\nHuman:"]);
        // Untouched fields keep defaults
        assert_eq!(settings.temperature, 0.7);
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new("r1").with_var("X", "alcohol");
        assert_eq!(record.id, "r1");
        assert_eq!(record.variables.get("X").map(String::as_str), Some("alcohol"));
    }

    #[test]
    fn test_result_serialization_skips_empty_fields() {
        let result = GenerationResult {
            record_id: "7".into(),
            status: GenerationStatus::Done,
            output: Some(serde_json::json!("text")),
            error: None,
            failed_at: None,
            attempts: 1,
            provider: ProviderName::OpenAi,
            model: "gpt-4".into(),
            grounded: false,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "done");
        assert_eq!(json["provider"], "openai");
        assert!(json.get("error").is_none());
        assert!(json.get("failed_at").is_none());
    }

    #[test]
    fn test_failed_state_serialization() {
        let json = serde_json::to_value(RequestState::Submitted).unwrap();
        assert_eq!(json, "submitted");
        assert!(RequestState::Failed.is_terminal());
        assert!(!RequestState::Parsed.is_terminal());
    }

    #[test]
    fn test_run_summary_record() {
        let mut summary = RunSummary::default();
        let mut result = GenerationResult {
            record_id: "1".into(),
            status: GenerationStatus::Done,
            output: None,
            error: None,
            failed_at: None,
            attempts: 1,
            provider: ProviderName::VLlm,
            model: "m".into(),
            grounded: false,
            timestamp: Utc::now(),
        };
        summary.record(&result);
        result.status = GenerationStatus::Failed;
        summary.record(&result);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }
}
