//! Command handlers for HLS Fetcher CLI
//!
//! This module implements the command handlers that coordinate between CLI
//! arguments, the configuration layer and the core application components.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::app::budget::ConcurrencyBudget;
use crate::app::client::HlsClient;
use crate::app::manifest::{read_job_queue, Manifest};
use crate::app::models::JobOutcome;
use crate::app::mux::Muxer;
use crate::app::sequencer::JobSequencer;
use crate::cli::progress::ProgressDisplay;
use crate::cli::{DownloadArgs, InspectArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, ManifestError, Result};

/// Handle the download command
///
/// Loads configuration, applies CLI overrides, reads the input queue and
/// processes every job strictly sequentially. Only startup conditions (bad
/// arguments, unreadable queue file) surface as errors; individual job
/// failures are reported in the summary and never abort the run.
pub async fn handle_download(
    args: DownloadArgs,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let mut config = AppConfig::load_or_default(config_path)?;
    apply_overrides(&mut config, &args);
    config.validate().map_err(AppError::Config)?;

    let client = Arc::new(HlsClient::new(config.client.clone(), config.retry.clone())?);
    let budget = ConcurrencyBudget::new(config.download.max_concurrent_downloads)?;
    let muxer = Muxer::new(config.mux.clone());
    let sequencer = JobSequencer::new(
        client,
        budget,
        muxer,
        config.storage.clone(),
        config.sequencer.clone(),
    );
    sequencer.prepare_storage().await?;

    let entries = read_job_queue(&args.queue).await.map_err(|e| match e {
        ManifestError::Io(io) => AppError::generic(format!(
            "Cannot read input queue {}: {}",
            args.queue.display(),
            io
        )),
        other => AppError::Manifest(other),
    })?;

    if entries.is_empty() {
        warn!("Input queue {} contains no jobs", args.queue.display());
        return Ok(());
    }

    info!(
        "Processing {} jobs from {} with {} concurrent downloads",
        entries.len(),
        args.queue.display(),
        config.download.max_concurrent_downloads
    );

    let mut monitor = ProgressDisplay::new(quiet);
    let outcomes = sequencer.run_queue(entries, &mut monitor).await;

    print_summary(&outcomes, quiet);
    Ok(())
}

/// Handle the inspect command
///
/// Fetches and parses a manifest, printing segment statistics and the first
/// few resolved segment URLs without downloading anything.
pub async fn handle_inspect(args: InspectArgs) -> Result<()> {
    let url = Url::parse(&args.url).map_err(|_| {
        AppError::Manifest(ManifestError::InvalidUrl {
            url: args.url.clone(),
        })
    })?;

    let client = HlsClient::with_defaults()?;
    let body = client.fetch_manifest(&url).await?;
    let manifest = Manifest::parse("inspect", &args.url, &body)?;

    println!("Manifest: {}", args.url);
    println!("Segments: {}", manifest.len());

    for segment in manifest.segments.iter().take(args.limit) {
        match manifest.segment_url(segment) {
            Ok(resolved) => println!("  [{}] {}", segment.ordinal, resolved),
            Err(_) => println!("  [{}] {} (unresolvable)", segment.ordinal, segment.reference),
        }
    }

    if manifest.len() > args.limit {
        println!("  ... and {} more", manifest.len() - args.limit);
    }

    Ok(())
}

/// Fold CLI overrides into the loaded configuration
fn apply_overrides(config: &mut AppConfig, args: &DownloadArgs) {
    config.download.max_concurrent_downloads = args.max_concurrent;

    if let Some(dir) = &args.segment_dir {
        config.storage.segment_dir = dir.clone();
    }
    if let Some(dir) = &args.artifact_dir {
        config.storage.artifact_dir = dir.clone();
    }
    if let Some(secs) = args.timeout {
        config.client.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.backoff {
        config.retry.backoff = Duration::from_secs(secs);
    }
    if let Some(attempts) = args.max_attempts {
        config.retry.max_attempts = Some(attempts);
    }
    if let Some(policy) = args.gap_policy {
        config.sequencer.gap_policy = policy;
    }
    if let Some(secs) = args.job_timeout {
        config.sequencer.job_timeout = Some(Duration::from_secs(secs));
    }
    if let Some(program) = &args.mux_program {
        config.mux.program = program.clone();
    }
}

/// Print the end-of-run summary
fn print_summary(outcomes: &[JobOutcome], quiet: bool) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes.len() - succeeded;

    info!(
        "Run complete: {} succeeded, {} failed out of {} jobs",
        succeeded,
        failed,
        outcomes.len()
    );

    if quiet {
        return;
    }

    println!();
    println!("{} of {} jobs completed", succeeded, outcomes.len());
    for outcome in outcomes {
        if outcome.is_success() {
            if let Some(artifact) = &outcome.artifact {
                println!(
                    "  {} -> {} ({} segments, {:.2}s)",
                    outcome.job_id,
                    artifact.display(),
                    outcome.segments_persisted,
                    outcome.elapsed.as_secs_f64()
                );
            }
        } else {
            println!(
                "  {} failed at {}: {}",
                outcome.job_id,
                outcome
                    .failed_at
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                outcome.error.as_deref().unwrap_or("no detail")
            );
        }
    }
}
