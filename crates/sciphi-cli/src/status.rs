//! `sciphi status` and `sciphi validate`.
//!
//! `status` only reads the config; `validate` also builds the configured
//! providers, which checks every required setting without touching the network.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use sciphi_core::config::{get_config_path, load_config, Config, ProviderConfig};
use sciphi_providers::registry::{resolve_api_base, ProviderSpec, PROVIDERS};
use sciphi_providers::build_from_config;

use crate::helpers::{mark, print_header};

/// How a provider's settings look, before anything is built.
#[derive(Debug, PartialEq)]
enum ProviderState {
    /// Every required setting is present.
    Ready { base: String, key_set: bool },
    /// Something required is missing or invalid.
    Incomplete(String),
}

fn provider_state(spec: &ProviderSpec, config: &ProviderConfig) -> ProviderState {
    if spec.requires_api_key && !config.has_api_key() {
        return ProviderState::Incomplete("no API key".to_string());
    }
    match resolve_api_base(spec, config) {
        Ok(base) => ProviderState::Ready {
            base,
            key_set: config.has_api_key(),
        },
        Err(e) => ProviderState::Incomplete(e.to_string()),
    }
}

fn resolved_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(get_config_path)
}

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path).context("failed to load configuration")?;
    let path = resolved_path(config_path);

    print_header("Status");

    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    let generation = &config.llm.generation;
    println!("  {:<14} {}", "LLM:".bold(), config.llm.provider);
    println!("  {:<14} {}", "Model:".bold(), generation.model);
    println!(
        "  {:<14} {}",
        "Parameters:".bold(),
        format!(
            "max_tokens: {} | temp: {} | top_p: {} | top_k: {}",
            generation.max_tokens_to_sample,
            generation.temperature,
            generation.top_p.map_or("-".to_string(), |p| p.to_string()),
            generation.top_k.map_or("-".to_string(), |k| k.to_string()),
        )
        .dimmed()
    );

    let rag = if config.rag.enabled {
        format!(
            "{} (top_k: {}, max_context: {})",
            config.rag.provider, config.rag.top_k, config.rag.max_context
        )
    } else {
        "disabled".dimmed().to_string()
    };
    println!("  {:<14} {}", "RAG:".bold(), rag);
    println!(
        "  {:<14} {}",
        "Retry:".bold(),
        format!(
            "{} attempts, {}ms base, {}ms max",
            config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
        )
        .dimmed()
    );

    println!();
    println!("  {}", "Providers:".bold());
    for spec in PROVIDERS {
        let status = match provider_state(spec, config.providers.get(spec.name)) {
            ProviderState::Ready { base, key_set } => {
                let key = if key_set { " (key set)" } else { "" };
                format!("{} {}{}", "✓".green(), base.dimmed(), key)
            }
            ProviderState::Incomplete(reason) => format!("· {}", reason).dimmed().to_string(),
        };
        println!(
            "    {:<16} {:<4} {}",
            spec.display_name,
            spec.kind.to_string(),
            status
        );
    }
    println!();

    Ok(())
}

/// Build the providers a run would use.
pub fn validate(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path).context("failed to load configuration")?;
    validate_config(&config)
}

fn validate_config(config: &Config) -> Result<()> {
    print_header("Validate");

    match build_from_config(config) {
        Ok(providers) => {
            println!(
                "  {} LLM  {} ({})",
                mark(true),
                providers.llm.display_name(),
                config.llm.generation.model
            );
            match &providers.rag {
                Some(rag) => println!("  {} RAG  {}", mark(true), rag.display_name()),
                None => println!("  {} RAG  {}", "·".dimmed(), "disabled".dimmed()),
            }
            println!();
            Ok(())
        }
        Err(e) => {
            println!("  {} {}", mark(false), e);
            println!();
            bail!("configuration is not usable: {}", e)
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
