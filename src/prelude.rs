//! Prelude module for HLS Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use hls_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hls_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(HlsClient::with_defaults()?);
//!     let budget = ConcurrencyBudget::new(MAX_CONCURRENT_DOWNLOADS)?;
//!     let sequencer = JobSequencer::new(
//!         client,
//!         budget,
//!         Muxer::default(),
//!         StorageConfig::default(),
//!         SequencerConfig::default(),
//!     );
//!
//!     sequencer.prepare_storage().await?;
//!     let spec = JobSpec::new("https://cdn.example/show/ep1/index.m3u8", "ep1");
//!     let outcome = sequencer.run_job(&spec, &mut NullMonitor).await;
//!     println!("{}", outcome.job_id);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Core orchestration
    ConcurrencyBudget,
    GapPolicy,
    HlsClient,
    JobMonitor,
    JobOutcome,
    // Data types
    JobSpec,
    JobStage,
    Manifest,
    Muxer,
    MuxerConfig,
    NullMonitor,
    ReassemblyOrderer,
    RetryPolicy,
    SegmentResult,
    SequencerConfig,
    StorageConfig,

    JobSequencer,

    // Queue reading (most commonly used entry point)
    read_job_queue,
};

// Unified configuration
pub use crate::config::{AppConfig, ConfigPresets};

// Commonly used constants
pub use crate::constants::{MAX_CONCURRENT_DOWNLOADS, SEGMENT_BACKOFF, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
