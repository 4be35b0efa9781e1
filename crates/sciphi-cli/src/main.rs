//! SciPhi CLI: entry point.
//!
//! # Commands
//!
//! - `sciphi generate --template T --input I --output O`: one result per JSONL record
//! - `sciphi textbook --toc C --template T --output O`: one result per outline section
//! - `sciphi status`: show configuration and provider status
//! - `sciphi validate`: build the configured providers without calling them
//! - `sciphi onboard`: write a default config file

mod generate;
mod helpers;
mod onboard;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use sciphi_pipeline::OutputParser;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// SciPhi: synthetic data generation with pluggable LLM and RAG providers
#[derive(Parser)]
#[command(name = "sciphi", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.sciphi/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one result per record of a JSONL file
    Generate {
        /// Prompt template (YAML)
        #[arg(short, long)]
        template: PathBuf,

        /// Input records (JSONL, one object per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (JSONL), truncated if it exists
        #[arg(short, long)]
        output: PathBuf,

        /// Ground prompts with retrieved context, even if disabled in config
        #[arg(long, default_value_t = false)]
        rag: bool,

        /// Output parser: pass_through, question_answer or json
        #[arg(long)]
        parser: Option<OutputParser>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Generate textbook sections from a table of contents
    Textbook {
        /// Table of contents (YAML)
        #[arg(long)]
        toc: PathBuf,

        /// Prompt template (YAML)
        #[arg(short, long)]
        template: PathBuf,

        /// Output file (JSONL), truncated if it exists
        #[arg(short, long)]
        output: PathBuf,

        /// Ground prompts with retrieved context, even if disabled in config
        #[arg(long, default_value_t = false)]
        rag: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Build the configured providers and report configuration errors
    Validate,

    /// Write a default config file
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_path);

    match cli.command {
        Commands::Generate {
            template,
            input,
            output,
            rag,
            parser,
            logs,
        } => {
            init_logging(logs);
            let run = generate::RunOptions {
                config_path,
                template: helpers::expand_path(&template),
                output: helpers::expand_path(&output),
                force_rag: rag,
                parser,
            };
            generate::generate(run, &helpers::expand_path(&input)).await
        }
        Commands::Textbook {
            toc,
            template,
            output,
            rag,
            logs,
        } => {
            init_logging(logs);
            let run = generate::RunOptions {
                config_path,
                template: helpers::expand_path(&template),
                output: helpers::expand_path(&output),
                force_rag: rag,
                parser: None,
            };
            generate::textbook(run, &helpers::expand_path(&toc)).await
        }
        Commands::Status => status::run(config_path.as_deref()),
        Commands::Validate => status::validate(config_path.as_deref()),
        Commands::Onboard => onboard::run(config_path.as_deref()),
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("sciphi=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_command() {
        let cli = Cli::parse_from([
            "sciphi",
            "--config",
            "/tmp/c.json",
            "generate",
            "-t",
            "qa.yaml",
            "-i",
            "in.jsonl",
            "-o",
            "out.jsonl",
            "--parser",
            "qa",
            "--rag",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        match cli.command {
            Commands::Generate { parser, rag, logs, .. } => {
                assert_eq!(parser, Some(OutputParser::QuestionAnswer));
                assert!(rag);
                assert!(!logs);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn rejects_unknown_parser() {
        let parsed = Cli::try_parse_from([
            "sciphi", "generate", "-t", "t", "-i", "i", "-o", "o", "--parser", "xml",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["sciphi", "status", "--config", "c.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Commands::Status));
    }
}
