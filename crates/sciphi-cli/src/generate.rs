//! `sciphi generate` and `sciphi textbook`: batch runs over a record source.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use sciphi_core::config::{load_config_with, Config};
use sciphi_core::types::{Record, RunSummary};
use sciphi_pipeline::{
    read_records, GenerationPipeline, JsonlSink, OutputParser, PromptTemplate, TableOfContents,
};
use sciphi_providers::build_from_config;

/// Settings shared by both batch commands.
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub template: PathBuf,
    pub output: PathBuf,
    /// Enable retrieval regardless of the config file.
    pub force_rag: bool,
    /// Overrides the template's parser.
    pub parser: Option<OutputParser>,
}

/// Run over a JSONL record file.
pub async fn generate(run: RunOptions, input: &Path) -> Result<()> {
    let records = read_records(input)
        .with_context(|| format!("failed to load records from {}", input.display()))?;
    info!("Loaded {} records from {}", records.len(), input.display());

    let summary = run_records(&run, records).await?;
    crate::helpers::print_summary(&summary, &run.output);
    Ok(())
}

/// Run over every section of a table of contents.
pub async fn textbook(run: RunOptions, toc_path: &Path) -> Result<()> {
    let toc = TableOfContents::load(toc_path)
        .with_context(|| format!("failed to load table of contents {}", toc_path.display()))?;
    let records = toc.records();
    info!(textbook = %toc.title, "Expanded table of contents into {} sections", records.len());

    let summary = run_records(&run, records).await?;
    crate::helpers::print_summary(&summary, &run.output);
    Ok(())
}

async fn run_records(run: &RunOptions, records: Vec<Record>) -> Result<RunSummary> {
    let config = effective_config(run, |key| std::env::var(key).ok())?;
    let pipeline = build_pipeline(run, &config)?;

    let mut sink = JsonlSink::create(&run.output)
        .with_context(|| format!("failed to open output {}", run.output.display()))?;
    pipeline
        .run(records, &mut sink)
        .await
        .with_context(|| format!("run aborted writing {}", run.output.display()))
}

/// Load the config once and apply command-line overrides.
fn effective_config<F>(run: &RunOptions, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = load_config_with(run.config_path.as_deref(), lookup)
        .context("failed to load configuration")?;
    if run.force_rag {
        config.rag.enabled = true;
    }
    Ok(config)
}

fn build_pipeline(run: &RunOptions, config: &Config) -> Result<GenerationPipeline> {
    let template = PromptTemplate::load(&run.template)
        .with_context(|| format!("failed to load template {}", run.template.display()))?;
    let providers = build_from_config(config).context("invalid provider configuration")?;

    let mut pipeline = GenerationPipeline::from_config(providers, template, config);
    if let Some(parser) = run.parser {
        pipeline = pipeline.with_parser(parser);
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn options(dir: &Path, config_json: &str) -> RunOptions {
        let config_path = dir.join("config.json");
        std::fs::write(&config_path, config_json).unwrap();
        let template = dir.join("qa.yaml");
        std::fs::write(&template, "name: qa\ntemplate: \"What is {X}?\"\n").unwrap();
        RunOptions {
            config_path: Some(config_path),
            template,
            output: dir.join("out/results.jsonl"),
            force_rag: false,
            parser: None,
        }
    }

    #[test]
    fn force_rag_enables_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = options(dir.path(), "{}");
        assert!(!effective_config(&run, no_env).unwrap().rag.enabled);
        run.force_rag = true;
        assert!(effective_config(&run, no_env).unwrap().rag.enabled);
    }

    #[tokio::test]
    async fn misspelt_provider_aborts_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let run = options(dir.path(), r#"{"llm": {"provider": "antrhopic"}}"#);

        let err = run_records(&run, vec![Record::new("1")]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("unknown provider 'antrhopic'"));
        assert!(!run.output.exists());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = options(dir.path(), "{}");
        run.config_path = Some(dir.path().join("nope.json"));

        let err = effective_config(&run, no_env).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.json"));
    }

    #[test]
    fn builds_pipeline_with_parser_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = options(
            dir.path(),
            r#"{"llm": {"provider": "llamacpp"}, "providers": {"llamacpp": {"apiBase": "http://127.0.0.1:8080"}}}"#,
        );
        run.parser = Some(OutputParser::Json);

        let config = effective_config(&run, no_env).unwrap();
        let pipeline = build_pipeline(&run, &config).unwrap();
        assert_eq!(pipeline.parser(), OutputParser::Json);
        assert!(!pipeline.is_grounded());
    }

    #[test]
    fn rag_without_settings_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = options(dir.path(), r#"{"llm": {"provider": "llamacpp"}}"#);
        run.force_rag = true;

        let config = effective_config(&run, no_env).unwrap();
        let err = build_pipeline(&run, &config).err().unwrap();
        assert!(format!("{:#}", err).contains("invalid provider configuration"));
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = options(dir.path(), "{}");
        run.template = dir.path().join("missing.yaml");

        let config = effective_config(&run, no_env).unwrap();
        let err = build_pipeline(&run, &config).err().unwrap();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
