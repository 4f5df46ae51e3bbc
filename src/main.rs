//! CLI entry point for the scihub tool.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use scihub_core::download::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MIRROR, READ_TIMEOUT_SECS};
use scihub_core::{FetchStats, Fetcher, HttpClient, classify};
use tracing::{debug, error, info, warn};
use url::Url;

mod cli;
mod config;

use cli::{Args, Command};

/// Default output directory when neither the CLI nor the config names one.
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    /// Nothing failed.
    Success,
    /// Some queries succeeded and some failed.
    Partial,
    /// Everything attempted failed, the run was interrupted, or a fatal error occurred.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Partial => ExitCode::from(2),
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

/// Determines the process exit outcome from succeeded and failed counts.
fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            error!("{err:#}");
            ProcessExit::Failure.into()
        }
    }
}

fn init_tracing(args: &Args) {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args) -> Result<ProcessExit> {
    let queries = match &args.command {
        Command::Classify { queries } => return Ok(run_classify(queries)),
        Command::File { file_path } => read_query_file(file_path)?,
        Command::Single { query } => vec![query.clone()],
    };

    let file_config = config::load_default_file_config()?;

    let output_dir = args
        .output
        .clone()
        .or_else(|| file_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let mirror_raw = args
        .mirror
        .clone()
        .or_else(|| file_config.mirror.clone())
        .unwrap_or_else(|| DEFAULT_MIRROR.to_string());
    let mirror =
        Url::parse(&mirror_raw).with_context(|| format!("Invalid mirror URL '{mirror_raw}'"))?;

    let client = HttpClient::new_with_timeouts(
        file_config
            .connect_timeout_secs
            .unwrap_or(CONNECT_TIMEOUT_SECS),
        file_config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    );
    let show_progress = io::stderr().is_terminal() && !args.quiet;
    let fetcher = Fetcher::new(client, mirror, &output_dir)?.with_progress(show_progress);

    info!(
        mirror = %fetcher.mirror(),
        output = %fetcher.output_dir().display(),
        queries = queries.len(),
        "scihub starting"
    );

    let (interrupt_tx, interrupt_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let stats = fetcher.download(queries, interrupt_rx).await?;
    Ok(exit_for_stats(&stats))
}

fn exit_for_stats(stats: &FetchStats) -> ProcessExit {
    if stats.was_interrupted() {
        warn!(saved = stats.saved(), "Interrupted. Run again to resume.");
        return ProcessExit::Failure;
    }
    determine_exit_outcome(stats.saved(), stats.failed() + stats.skipped())
}

fn read_query_file(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file '{}'", path.display()))?;
    Ok(raw.lines().map(str::to_string).collect())
}

fn run_classify(queries: &[String]) -> ProcessExit {
    let mut recognized = 0;
    let mut unrecognized = 0;
    for query in queries {
        let classified = classify(query);
        if classified.is_unrecognized() {
            unrecognized += 1;
        } else {
            recognized += 1;
        }
        println!("{classified}");
    }
    determine_exit_outcome(recognized, unrecognized)
}
