//! Command-line interface components
//!
//! This module contains CLI-specific code for the HLS Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DownloadArgs, GlobalArgs, InspectArgs};
pub use commands::{handle_download, handle_inspect};
pub use progress::ProgressDisplay;
