//! Progress reporting for the scan
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::walker::{RunSummary, ScanProgress};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Spinner that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        let msg = format!(
            "Found: {} | Hashed: {} | Failed: {} | Size: {} | Rate: {:.0}/s | Queue: {} | Active: {}/{}",
            format_number(progress.discovered),
            format_number(progress.records),
            format_number(progress.failures),
            format_size(progress.bytes, BINARY),
            progress.files_per_second(),
            format_number(progress.queued),
            progress.active_workers,
            progress.concurrency,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
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
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(summary: &RunSummary, output: &Path) {
    let duration_secs = summary.elapsed.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        summary.files_discovered as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    if summary.interrupted {
        println!("{}", style("Scan Interrupted").yellow().bold());
    } else {
        println!("{}", style("Scan Complete").green().bold());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(summary.walk.dirs_scanned)
    );
    println!(
        "  {} {}",
        style("Files:").bold(),
        format_number(summary.files_discovered)
    );
    println!(
        "  {} {}",
        style("Records:").bold(),
        format_number(summary.records)
    );
    println!(
        "  {} {}",
        style("Hashed:").bold(),
        format_size(summary.bytes_hashed, BINARY)
    );
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    let cancelled = summary.cancelled_count();
    let failed = summary.failure_count() - cancelled;
    if failed > 0 {
        println!(
            "  {} {}",
            style("Failures:").yellow().bold(),
            format_number(failed)
        );
    }
    if cancelled > 0 {
        println!(
            "  {} {}",
            style("Cancelled:").yellow().bold(),
            format_number(cancelled)
        );
    }
    let skipped = summary.walk.dirs_skipped + summary.walk.special_skipped;
    if skipped > 0 {
        println!(
            "  {} {}",
            style("Skipped:").yellow().bold(),
            format_number(skipped)
        );
    }
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}

/// Print a header at the start of the run
pub fn print_header(root: &Path, concurrency: usize, digest: &str, output: &Path) {
    println!();
    println!(
        "{} {}",
        style("tree-digest").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), root.display());
    println!("  {} {}", style("Workers:").bold(), concurrency);
    println!("  {} {}", style("Digest:").bold(), digest);
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}
