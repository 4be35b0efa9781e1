//! SciPhi core: shared vocabulary for the provider layer and the pipeline.
//!
//! - [`types`]: provider identity, generation settings, records, results
//! - [`config`]: JSON config schema and loader with env overrides
//! - [`error`]: configuration/construction errors
//! - [`utils`]: paths and string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{ConfigError, ConfigLoadError};
pub use types::{
    GenerationResult, GenerationSettings, GenerationStatus, ProviderKind, ProviderName, Record,
    RequestState, RunSummary,
};
