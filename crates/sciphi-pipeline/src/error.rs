//! Error types for templates, input sources, output parsing and runs.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to compile or render a prompt template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("missing variable '{0}'")]
    MissingVariable(String),

    #[error("invalid placeholder '{{{0}}}'")]
    InvalidPlaceholder(String),

    #[error("unbalanced '{brace}' at byte {offset}")]
    UnbalancedBrace { brace: char, offset: usize },
}

/// Failure to turn raw model output into the expected shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("model returned empty output")]
    Empty,

    #[error("no JSON value found in output")]
    NoJson,

    #[error("invalid JSON in output: {0}")]
    InvalidJson(String),
}

/// Failure to load a template, record file, or table of contents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{source_name} line {line}: {reason}")]
    Record {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("invalid template '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: TemplateError,
    },
}

/// Errors that abort a whole run. Per-record failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to write result: {0}")]
    Sink(#[from] std::io::Error),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}
