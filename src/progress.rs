//! Progress reporting for defrag
//!
//! Provides a live spinner while collectors run, plus the header and summary
//! printed around a run.

use crate::coordinator::DefragResult;
use crate::walker::CollectProgress;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays collection status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let template =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}");
        if let Ok(spinner) = template {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &CollectProgress) {
        let msg = format!(
            "Dirs: {} | Chunks: {} | Size: {} | Rate: {:.0}/s | Slots: {} | Workers: {}/{}",
            format_number(progress.stats.dirs_visited),
            format_number(progress.stats.chunks_found),
            format_size(progress.stats.chunk_bytes, BINARY),
            progress.chunks_per_second(),
            format_number(progress.registry_len as u64),
            progress.active_workers,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(result: &DefragResult, output: &Path) {
    let duration_secs = result.duration.as_secs_f64();
    let stats = &result.collected;

    println!();
    println!("{}", style("Reassembly Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Collectors:").bold(), result.workers);
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.dirs_visited)
    );
    println!("  {} {}", style("Chunks:").bold(), format_number(result.assembled.chunks));
    println!(
        "  {} {}",
        style("Ignored files:").bold(),
        format_number(stats.noise_files)
    );
    println!("  {} {:.2}s", style("Duration:").bold(), duration_secs);
    if result.duplicates > 0 {
        println!(
            "  {} {}",
            style("Duplicates replaced:").yellow().bold(),
            format_number(result.duplicates)
        );
    }
    let skipped = stats.subtrees_skipped + stats.errors + result.launch_failures as u64;
    if skipped > 0 {
        println!(
            "  {} {}",
            style("Skipped:").yellow().bold(),
            format_number(skipped)
        );
    }
    println!(
        "  {} {} ({})",
        style("Output:").bold(),
        output.display(),
        format_size(result.assembled.bytes, BINARY)
    );
    println!();
}

/// Print a header at the start of the run
pub fn print_header(input: &Path, output: &Path) {
    println!();
    println!(
        "{} {}",
        style("defrag").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input.display());
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}
