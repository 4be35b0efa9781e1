//! Provider traits: the uniform contracts every backend implements.
//!
//! - [`LlmProvider::complete`] turns a prompt into text.
//! - [`RagProvider::retrieve`] turns a query into a grounding block (or nothing).

use async_trait::async_trait;
use serde::Deserialize;

use sciphi_core::types::{GenerationSettings, ProviderName};
use sciphi_core::utils::truncate_chars;

use crate::error::CompletionError;

/// End-of-text markers some backends leave at the end of a completion.
const END_MARKERS: &[&str] = &["</s>", "<|endoftext|>", "<|im_end|>", "<|eot_id|>"];

// ─────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────

/// Trait that all LLM providers must implement.
///
/// Instances are built once per run by the manager and shared read-only.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// Returns the generated text with backend stop markers stripped.
    async fn complete(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, CompletionError>;

    /// Registry identifier of this provider.
    fn name(&self) -> ProviderName;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

/// Remove trailing stop sequences and end-of-text markers, then trim.
///
/// Markers are stripped repeatedly so `"text</s>\n<|im_end|>"` becomes `"text"`.
pub fn strip_stop_markers(text: &str, stop_sequences: &[String]) -> String {
    let mut out = text.trim_end();
    loop {
        let before = out.len();
        for marker in END_MARKERS
            .iter()
            .copied()
            .chain(stop_sequences.iter().map(String::as_str))
        {
            if marker.is_empty() {
                continue;
            }
            if let Some(stripped) = out.strip_suffix(marker) {
                out = stripped.trim_end();
            }
        }
        if out.len() == before {
            break;
        }
    }
    out.trim().to_string()
}

// ─────────────────────────────────────────────
// RAG
// ─────────────────────────────────────────────

/// Trait that all retrieval providers must implement.
#[async_trait]
pub trait RagProvider: Send + Sync {
    /// Retrieve grounding text for `query`.
    ///
    /// Keeps at most `top_k` passages and at most `max_context` characters.
    /// `Ok(None)` means nothing relevant was found, which is not an error.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        max_context: usize,
    ) -> Result<Option<String>, CompletionError>;

    fn name(&self) -> ProviderName;

    fn display_name(&self) -> &str;
}

/// One retrieved passage.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Decides which passages are relevant enough to ground a prompt.
pub trait PassagePolicy: Send + Sync {
    /// Rank and filter `passages`, keeping at most `top_k`.
    fn select(&self, passages: Vec<Passage>, top_k: usize) -> Vec<Passage>;
}

/// Default policy: drop passages under `min_score`, best score first.
///
/// Passages without a score are kept (they sort last) unless a threshold is set.
#[derive(Clone, Debug, Default)]
pub struct ScoreThreshold {
    pub min_score: Option<f64>,
}

impl PassagePolicy for ScoreThreshold {
    fn select(&self, passages: Vec<Passage>, top_k: usize) -> Vec<Passage> {
        let mut kept: Vec<Passage> = passages
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .filter(|p| match (self.min_score, p.score) {
                (Some(min), Some(score)) => score >= min,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();

        // Stable: equal scores keep backend order
        kept.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        kept.truncate(top_k);
        kept
    }
}

/// Join passages into one grounding block of at most `max_context` characters.
///
/// Returns `None` when there is nothing to ground with.
pub fn render_grounding(passages: &[Passage], max_context: usize) -> Option<String> {
    let block = passages
        .iter()
        .map(|p| match p.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("{}\n{}", title, p.text.trim()),
            None => p.text.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let block = truncate_chars(&block, max_context).trim_end();
    if block.is_empty() {
        None
    } else {
        Some(block.to_string())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(title: &str, text: &str, score: Option<f64>) -> Passage {
        Passage {
            title: Some(title.to_string()),
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn test_strip_end_markers() {
        assert_eq!(strip_stop_markers("Paris</s>", &[]), "Paris");
        assert_eq!(strip_stop_markers("Paris <|im_end|>\n", &[]), "Paris");
        assert_eq!(strip_stop_markers("Paris</s>\n<|endoftext|>", &[]), "Paris");
    }

    #[test]
    fn test_strip_configured_stop_sequence() {
        let stops = vec!["\n\nHuman:".to_string()];
        assert_eq!(strip_stop_markers(" Answer here\n\nHuman:", &stops), "Answer here");
    }

    #[test]
    fn test_strip_keeps_inner_markers() {
        assert_eq!(strip_stop_markers("a </s> b", &[]), "a </s> b");
    }

    #[test]
    fn test_strip_ignores_empty_stop() {
        assert_eq!(strip_stop_markers("text", &[String::new()]), "text");
    }

    #[test]
    fn test_threshold_filters_and_ranks() {
        let policy = ScoreThreshold {
            min_score: Some(0.5),
        };
        let selected = policy.select(
            vec![
                passage("a", "low", Some(0.1)),
                passage("b", "mid", Some(0.6)),
                passage("c", "high", Some(0.9)),
                passage("d", "unscored", None),
            ],
            10,
        );
        let texts: Vec<&str> = selected.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid"]);
    }

    #[test]
    fn test_no_threshold_keeps_order_for_ties_and_truncates() {
        let policy = ScoreThreshold::default();
        let selected = policy.select(
            vec![
                passage("a", "first", None),
                passage("b", "second", None),
                passage("c", "third", None),
            ],
            2,
        );
        let texts: Vec<&str> = selected.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_blank_passages_dropped() {
        let selected = ScoreThreshold::default().select(vec![passage("t", "   ", Some(1.0))], 5);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_render_grounding_joins_and_truncates() {
        let passages = vec![
            passage("Esters", "Formed from acids.", None),
            Passage {
                title: None,
                text: "Second.".into(),
                score: None,
            },
        ];
        let full = render_grounding(&passages, 1000).unwrap();
        assert_eq!(full, "Esters\nFormed from acids.\n\nSecond.");

        let cut = render_grounding(&passages, 6).unwrap();
        assert_eq!(cut, "Esters");
    }

    #[test]
    fn test_render_grounding_empty() {
        assert!(render_grounding(&[], 100).is_none());
        assert!(render_grounding(&[passage("t", "text", None)], 0).is_none());
    }
}
