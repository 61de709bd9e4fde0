//! HLS Fetcher CLI application
//!
//! Command-line interface for downloading segmented media streams from m3u8
//! playlists. Features bounded concurrent downloads, automatic retry and
//! deterministic reassembly into single output files.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use hls_fetcher::cli::{handle_download, handle_inspect, Cli, Commands};
use hls_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(&cli);

    info!("HLS Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    // Execute the appropriate command
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, cli.global.config.as_deref(), cli.global.quiet).await
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            handle_inspect(args).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    // Create environment filter
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hls_fetcher={}", log_level).parse().unwrap());

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
