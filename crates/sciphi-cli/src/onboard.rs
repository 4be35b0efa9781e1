//! `sciphi onboard`: write a default config and a starter template.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use sciphi_core::config::{get_config_path, save_config, Config};

use crate::helpers::print_header;

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    print_header("Setup");

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        save_config(&Config::default(), Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let templates_dir = config_path
        .parent()
        .map(|p| p.join("templates"))
        .unwrap_or_else(|| Path::new("templates").to_path_buf());
    std::fs::create_dir_all(&templates_dir)
        .with_context(|| format!("failed to create {}", templates_dir.display()))?;
    create_template(&templates_dir.join("qa.yaml"), QA_TEMPLATE)?;
    create_template(&templates_dir.join("textbook.yaml"), TEXTBOOK_TEMPLATE)?;

    println!();
    println!(
        "{}",
        "  Setup complete! Add an API key, then run `sciphi validate`.".green()
    );
    println!();

    Ok(())
}

/// Create a template file if it doesn't exist.
fn create_template(path: &Path, content: &str) -> Result<()> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    if path.exists() {
        println!("  {} {} already exists", "✓".green(), name);
    } else {
        std::fs::write(path, content)?;
        println!("  {} created {}", "✓".green(), name);
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────

const QA_TEMPLATE: &str = r#"name: qa
template: "What is {topic}? Answer in one concise paragraph."
parser: question_answer
"#;

const TEXTBOOK_TEMPLATE: &str = r#"name: textbook-section
template: |
  You are writing the textbook "{textbook}". {description}
  Write the section "{section}" of the chapter "{chapter}".
  Cover these subsections: {subsections}.
parser: pass_through
"#;

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
