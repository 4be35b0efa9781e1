//! The generation pipeline.
//!
//! Each record moves through `Pending → Templated → (Retrieved) → Submitted →
//! Parsed → Done`. Records are processed one at a time and every record
//! produces exactly one result line, success or failure, so output order
//! always matches input order.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use sciphi_core::config::{Config, RagQuery};
use sciphi_core::types::{
    GenerationResult, GenerationSettings, GenerationStatus, Record, RequestState, RunSummary,
};
use sciphi_providers::{
    retry_with_backoff, CompletionError, LlmProvider, RagProvider, Retried, RetryFailure,
    RetryPolicy, RunProviders,
};

use crate::error::PipelineError;
use crate::parser::OutputParser;
use crate::sink::JsonlSink;
use crate::template::PromptTemplate;

/// Retrieval wiring for a grounded run.
struct Grounding {
    provider: Arc<dyn RagProvider>,
    top_k: usize,
    max_context: usize,
    query: RagQuery,
}

/// Turns records into results with one LLM and at most one RAG provider.
pub struct GenerationPipeline {
    llm: Arc<dyn LlmProvider>,
    grounding: Option<Grounding>,
    template: PromptTemplate,
    parser: OutputParser,
    settings: GenerationSettings,
    retry: RetryPolicy,
}

impl GenerationPipeline {
    /// Ungrounded pipeline with default settings. The parser comes from the
    /// template when it names one.
    pub fn new(llm: Arc<dyn LlmProvider>, template: PromptTemplate) -> Self {
        let parser = template.parser().unwrap_or_default();
        Self {
            llm,
            grounding: None,
            template,
            parser,
            settings: GenerationSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Wire providers and settings from a loaded config.
    pub fn from_config(providers: RunProviders, template: PromptTemplate, config: &Config) -> Self {
        let mut pipeline = Self::new(providers.llm, template)
            .with_settings(config.llm.generation.clone())
            .with_retry(RetryPolicy::from(&config.retry));
        if let Some(rag) = providers.rag {
            pipeline = pipeline
                .with_rag(rag, config.rag.top_k, config.rag.max_context)
                .with_rag_query(config.rag.query.clone());
        }
        pipeline
    }

    pub fn with_rag(mut self, rag: Arc<dyn RagProvider>, top_k: usize, max_context: usize) -> Self {
        self.grounding = Some(Grounding {
            provider: rag,
            top_k,
            max_context,
            query: RagQuery::Prompt,
        });
        self
    }

    /// Choose where retrieval queries come from. No effect without RAG.
    pub fn with_rag_query(mut self, query: RagQuery) -> Self {
        if let Some(grounding) = self.grounding.as_mut() {
            grounding.query = query;
        }
        self
    }

    pub fn with_parser(mut self, parser: OutputParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn parser(&self) -> OutputParser {
        self.parser
    }

    pub fn is_grounded(&self) -> bool {
        self.grounding.is_some()
    }

    /// Process every record in order, writing one line per record.
    ///
    /// Per-record failures are written and counted; only sink errors abort.
    pub async fn run<I, W>(
        &self,
        records: I,
        sink: &mut JsonlSink<W>,
    ) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = Record>,
        W: Write,
    {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        info!(
            provider = %self.llm.display_name(),
            model = %self.settings.model,
            template = %self.template.name(),
            parser = %self.parser,
            grounded = self.is_grounded(),
            "Starting generation run"
        );

        for record in records {
            let result = self.process(&record).await;
            if let Some(error) = &result.error {
                warn!(record = %result.record_id, attempts = result.attempts, "Record failed: {}", error);
            }
            sink.write(&result)?;
            summary.record(&result);
        }

        summary.runtime_secs = started.elapsed().as_secs_f64();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Generation run finished in {:.1}s",
            summary.runtime_secs
        );
        Ok(summary)
    }

    /// Drive one record to a terminal state.
    pub async fn process(&self, record: &Record) -> GenerationResult {
        let prompt = match self.template.render(&record.variables) {
            Ok(prompt) => prompt,
            Err(e) => return self.failure(record, RequestState::Pending, e.to_string(), 0, false),
        };
        debug!(record = %record.id, "Templated prompt ({} chars)", prompt.chars().count());

        let (full_prompt, grounded) = match self.retrieve_context(record, &prompt).await {
            Some(context) => (format!("{}\n\n### Context:\n{}", prompt, context), true),
            None => (prompt.clone(), false),
        };

        let llm = &self.llm;
        let settings = &self.settings;
        let full_prompt = full_prompt.as_str();
        let outcome = retry_with_backoff(&self.retry, CompletionError::classify, |attempt| async move {
            debug!(provider = %llm.display_name(), attempt, "Submitting prompt");
            llm.complete(full_prompt, settings).await
        })
        .await;

        match outcome {
            Ok(Retried { value: raw, attempts }) => match self.parser.parse(&raw, &prompt) {
                Ok(output) => self.success(record, output, attempts, grounded),
                Err(e) => self.failure(record, RequestState::Parsed, e.to_string(), attempts, grounded),
            },
            Err(RetryFailure { error, attempts }) => {
                self.failure(record, RequestState::Submitted, error.to_string(), attempts, grounded)
            }
        }
    }

    /// Fetch grounding text. Empty retrievals and retrieval errors both
    /// leave the prompt unaugmented.
    async fn retrieve_context(&self, record: &Record, prompt: &str) -> Option<String> {
        let grounding = self.grounding.as_ref()?;

        let query = match &grounding.query {
            RagQuery::Prompt => prompt,
            RagQuery::Variable(name) => match record.variables.get(name) {
                Some(value) => value.as_str(),
                None => {
                    warn!(record = %record.id, "RAG query variable '{}' missing, querying with the prompt", name);
                    prompt
                }
            },
        };

        let rag = &grounding.provider;
        let (top_k, max_context) = (grounding.top_k, grounding.max_context);
        let outcome = retry_with_backoff(&self.retry, CompletionError::classify, |_| async move {
            rag.retrieve(query, top_k, max_context).await
        })
        .await;

        match outcome {
            Ok(Retried { value: Some(context), .. }) => Some(context),
            Ok(Retried { value: None, .. }) => {
                debug!(record = %record.id, "No relevant passages, continuing ungrounded");
                None
            }
            Err(RetryFailure { error, attempts }) => {
                warn!(
                    record = %record.id,
                    provider = %rag.display_name(),
                    attempts,
                    "Retrieval failed, continuing ungrounded: {}",
                    error
                );
                None
            }
        }
    }

    fn success(&self, record: &Record, output: Value, attempts: u32, grounded: bool) -> GenerationResult {
        GenerationResult {
            record_id: record.id.clone(),
            status: GenerationStatus::Done,
            output: Some(output),
            error: None,
            failed_at: None,
            attempts,
            provider: self.llm.name(),
            model: self.settings.model.clone(),
            grounded,
            timestamp: Utc::now(),
        }
    }

    fn failure(
        &self,
        record: &Record,
        at: RequestState,
        error: String,
        attempts: u32,
        grounded: bool,
    ) -> GenerationResult {
        GenerationResult {
            record_id: record.id.clone(),
            status: GenerationStatus::Failed,
            output: None,
            error: Some(error),
            failed_at: Some(at),
            attempts,
            provider: self.llm.name(),
            model: self.settings.model.clone(),
            grounded,
            timestamp: Utc::now(),
        }
    }
}
