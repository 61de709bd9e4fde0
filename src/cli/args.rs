//! Command-line argument parsing for HLS Fetcher
//!
//! This module defines the CLI structure using clap derive macros,
//! providing a user-friendly interface for queue-driven downloads and
//! manifest inspection.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::assembly::GapPolicy;
use crate::constants::{budget, files};

/// HLS Fetcher - download segmented media streams
#[derive(Parser, Debug)]
#[command(
    name = "hls_fetcher",
    version,
    about = "Download segmented HLS streams and reassemble them into single files",
    long_about = "A tool for downloading segmented media streams described by m3u8 playlists.
Segments are fetched concurrently under a fixed budget, retried on failure, and
reassembled in manifest order into one output file via an external muxer."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download all jobs listed in an input queue file
    Download(DownloadArgs),

    /// Fetch a manifest and show its segment list without downloading
    Inspect(InspectArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Input queue file: one `<manifest-url> <job-id>` pair per line
    #[arg(value_name = "QUEUE", default_value = files::INPUT_QUEUE_FILE)]
    pub queue: PathBuf,

    /// Maximum concurrently active segment downloads
    #[arg(short = 'c', long, default_value_t = budget::MAX_CONCURRENT_DOWNLOADS)]
    pub max_concurrent: usize,

    /// Directory for raw segment bytes
    #[arg(long, value_name = "DIR")]
    pub segment_dir: Option<PathBuf>,

    /// Directory for manifests and muxed artifacts
    #[arg(long, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Backoff between fetch attempts in seconds
    #[arg(long, value_name = "SECS")]
    pub backoff: Option<u64>,

    /// Retry ceiling per segment (default: retry forever)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// What to do when segments are missing at reassembly time
    #[arg(long, value_enum)]
    pub gap_policy: Option<GapPolicy>,

    /// Abort a job after this many seconds in the segment phase
    #[arg(long, value_name = "SECS")]
    pub job_timeout: Option<u64>,

    /// Muxer program to invoke (default: ffmpeg)
    #[arg(long, value_name = "PROGRAM")]
    pub mux_program: Option<String>,
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Manifest URL to inspect
    #[arg(value_name = "URL")]
    pub url: String,

    /// Maximum number of segment references to print
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl DownloadArgs {
    /// Validate argument combinations that clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.max_concurrent > budget::MAX_BUDGET {
            return Err(format!(
                "Concurrency ({}) exceeds maximum ({})",
                self.max_concurrent,
                budget::MAX_BUDGET
            ));
        }

        if self.max_attempts == Some(0) {
            return Err("--max-attempts must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("--timeout must be at least 1 second".to_string());
        }

        Ok(())
    }
}
