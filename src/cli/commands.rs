//! Command implementations for mml-extract
//!
//! Sets up logging, builds the configuration from the parsed arguments and
//! hands off to the [`ExtractionProcessor`].

use super::args::{Args, CheckOffsetsArgs, Commands, ExtractArgs, InputArgs};
use crate::models::ProcessingStats;
use crate::offsets::OffsetReport;
use crate::processor::{ExtractionProcessor, run_timestamp};
use crate::target_cuis::TargetCuiIndex;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of a completed command
#[derive(Debug)]
pub enum CommandOutcome {
    Extracted(ProcessingStats),
    OffsetsChecked(OffsetReport),
    NothingToDo,
}

/// Main entry point for CLI commands
pub async fn run(args: Args, cancellation_token: CancellationToken) -> Result<CommandOutcome> {
    // Set up logging
    if let Some(input) = args.input() {
        setup_logging(input);
    }
    debug!("Command line arguments: {:?}", args);

    match args.command {
        Some(Commands::Extract(extract)) => run_extract(extract, &cancellation_token)
            .await
            .map(CommandOutcome::Extracted),
        Some(Commands::CheckOffsets(check)) => run_check_offsets(check, &cancellation_token)
            .await
            .map(CommandOutcome::OffsetsChecked),
        None => Ok(CommandOutcome::NothingToDo),
    }
}

/// Load the target CUI index, or pass every CUI through when no file is given
fn load_targets(cui_file: Option<&PathBuf>) -> Result<TargetCuiIndex> {
    match cui_file {
        Some(path) => TargetCuiIndex::from_file(path)
            .with_context(|| format!("Failed to load CUI file {}", path.display())),
        None => Ok(TargetCuiIndex::default()),
    }
}

async fn run_extract(
    args: ExtractArgs,
    cancellation_token: &CancellationToken,
) -> Result<ProcessingStats> {
    info!("Starting extraction");
    let targets = load_targets(args.cui_file.as_ref())?;

    // One timestamp names both output tables
    let timestamp = run_timestamp();
    debug!("Run timestamp: {}", timestamp);

    let processor = ExtractionProcessor::new(
        args.input.directories.clone(),
        args.outdir.clone(),
        targets,
    )
    .with_config(args.config())
    .with_timestamp(timestamp)
    .with_progress(args.input.show_progress());

    processor
        .process(cancellation_token)
        .await
        .context("Extraction failed")
}

async fn run_check_offsets(
    args: CheckOffsetsArgs,
    cancellation_token: &CancellationToken,
) -> Result<OffsetReport> {
    info!("Starting offset check");
    let processor = ExtractionProcessor::new(
        args.input.directories.clone(),
        PathBuf::from("."),
        TargetCuiIndex::default(),
    )
    .with_config(args.config())
    .with_progress(args.input.show_progress());

    processor
        .check_offsets(cancellation_token)
        .await
        .context("Offset check failed")
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &InputArgs) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    // Create filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mml_extract={}", log_level)));

    // Set up subscriber based on output format preference
    let result = if args.quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        // Standard logging with timestamps
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // Already installed (tests run several commands in one process)
    if result.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}
