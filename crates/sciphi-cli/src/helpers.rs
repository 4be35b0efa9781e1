//! Shared CLI helpers: path expansion and run reporting.

use std::path::{Path, PathBuf};

use colored::Colorize;

use sciphi_core::types::RunSummary;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    if let Some(rest) = text.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if text == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    path.to_path_buf()
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", format!("SciPhi {}", title).cyan().bold());
    println!();
}

/// Print the totals of a finished run.
pub fn print_summary(summary: &RunSummary, output: &Path) {
    println!();
    println!("{}", "Run complete".cyan().bold());
    println!("  {:<12} {}", "Records:".bold(), summary.total);
    println!(
        "  {:<12} {}",
        "Succeeded:".bold(),
        summary.succeeded.to_string().green()
    );
    let failed = if summary.failed == 0 {
        summary.failed.to_string().dimmed()
    } else {
        summary.failed.to_string().red()
    };
    println!("  {:<12} {}", "Failed:".bold(), failed);
    println!("  {:<12} {:.1}s", "Runtime:".bold(), summary.runtime_secs);
    println!("  {:<12} {}", "Output:".bold(), output.display());
    println!();
}

/// Green check or red cross.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
