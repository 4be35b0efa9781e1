//! SciPhi generation pipeline.
//!
//! - [`template`]: YAML prompt templates with `{variable}` placeholders
//! - [`records`] / [`toc`]: record sources (JSONL files, textbook outlines)
//! - [`parser`]: shapes raw model text into the written output
//! - [`pipeline`]: the per-record state machine and batch runner
//! - [`sink`]: streaming JSONL output

pub mod error;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod sink;
pub mod template;
pub mod toc;

pub use error::{LoadError, ParseError, PipelineError, TemplateError};
pub use parser::OutputParser;
pub use pipeline::GenerationPipeline;
pub use records::{parse_records, read_records};
pub use sink::JsonlSink;
pub use template::PromptTemplate;
pub use toc::TableOfContents;
