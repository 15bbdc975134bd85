//! tree-digest - Parallel File Digest Scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tree_digest::config::{CliArgs, ScanJob};
use tree_digest::progress::{print_header, print_summary, ProgressReporter};
use tree_digest::report::TracingReporter;
use tree_digest::walker::{RunSummary, ScanCoordinator};

/// Conventional exit status for a run stopped by SIGINT
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    match run() {
        Ok(summary) if summary.interrupted => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RunSummary> {
    let args = CliArgs::parse();

    let job = ScanJob::from_args(args).context("Invalid configuration")?;

    setup_logging(job.verbose)?;
    info!("Using {} digest, {} output format", job.digest, job.format);

    if job.show_progress {
        print_header(&job.root, job.concurrency, &job.digest.to_string(), &job.output);
    }

    let output = job.output.clone();
    let show_progress = job.show_progress;
    let coordinator = ScanCoordinator::new(job, Arc::new(TracingReporter));

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing submitted files...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let summary = if show_progress {
        let progress = Arc::new(ProgressReporter::new());
        progress.set_status("Scanning...");

        let updater = Arc::clone(&progress);
        let result = coordinator.run_with_progress(move |p| updater.update(&p));

        match &result {
            Ok(s) if s.interrupted => progress.finish("Scan interrupted"),
            Ok(_) => progress.finish("Scan completed"),
            Err(_) => progress.finish_and_clear(),
        }
        result.context("Scan failed")?
    } else {
        coordinator.run().context("Scan failed")?
    };

    if show_progress {
        print_summary(&summary, &output);
    }

    if summary.interrupted {
        info!("Scan was interrupted before completion");
    }

    if summary.failure_count() > 0 {
        info!(failures = summary.failure_count(), "Scan completed with failures");
    }

    Ok(summary)
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("tree_digest=debug,warn")
    } else {
        EnvFilter::new("tree_digest=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
