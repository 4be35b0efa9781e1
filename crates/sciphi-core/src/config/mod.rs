//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use sciphi_core::config;
//!
//! let cfg = config::load_config(None)?;
//! println!("Model: {}", cfg.llm.generation.model);
//! # Ok::<(), sciphi_core::ConfigLoadError>(())
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{
    conventional_base_var, conventional_key_var, get_config_path, load_config, load_config_with,
    save_config,
};
pub use schema::{
    Config, LlmConfig, ProviderConfig, ProvidersConfig, RagConfig, RagQuery, RetryConfig,
};
