//! Provider layer for SciPhi.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] / [`traits::RagProvider`]: the uniform contracts
//! - [`registry`]: static specs for every supported backend
//! - [`manager`]: builds provider instances from a name + config
//! - [`openai_compat`], [`anthropic`], [`llamacpp`]: LLM backends
//! - [`sciphi_wiki`]: RAG backend
//! - [`retry`]: exponential backoff around any classified call

pub mod anthropic;
pub mod error;
mod http;
pub mod llamacpp;
pub mod manager;
pub mod openai_compat;
pub mod registry;
pub mod retry;
pub mod sciphi_wiki;
pub mod traits;

// Re-export main types for convenience
pub use error::{Classification, CompletionError};
pub use manager::{
    build_from_config, get_interface_from_args, llm_from_args, rag_from_args, ProviderInstance,
    RunProviders,
};
pub use registry::{ProviderSpec, PROVIDERS};
pub use retry::{retry_with_backoff, Retried, RetryFailure, RetryPolicy};
pub use traits::{LlmProvider, Passage, PassagePolicy, RagProvider, ScoreThreshold};
