//! Configuration and construction errors.
//!
//! These are the only errors that are fatal to a whole run: they surface while
//! the config file is read or providers are built, before any record is processed.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ProviderKind, ProviderName};

/// Failure to resolve or construct a provider from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The name does not match any registered provider.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{provider}' cannot be used as the {expected} provider")]
    KindMismatch {
        provider: ProviderName,
        expected: ProviderKind,
    },

    #[error("provider '{provider}' requires {setting} (set {hint})")]
    MissingSetting {
        provider: ProviderName,
        setting: &'static str,
        hint: String,
    },

    #[error("provider '{provider}' has an invalid {setting}: {reason}")]
    InvalidSetting {
        provider: ProviderName,
        setting: &'static str,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure to read a config file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, a wrongly typed field, or an unknown provider name.
    #[error("invalid config file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}
