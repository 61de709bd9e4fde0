//! Core application logic for HLS Fetcher
//!
//! This module contains the main application components: the HTTP client,
//! playlist parsing, the bounded dispatcher with its completion barrier,
//! deterministic reassembly, external muxing and the per-job sequencer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hls_fetcher::app::{
//!     ConcurrencyBudget, HlsClient, JobSequencer, JobSpec, Muxer, NullMonitor,
//!     SequencerConfig, StorageConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HlsClient::with_defaults()?);
//! let budget = ConcurrencyBudget::new(6)?;
//! let sequencer = JobSequencer::new(
//!     client,
//!     budget,
//!     Muxer::default(),
//!     StorageConfig::default(),
//!     SequencerConfig::default(),
//! );
//!
//! sequencer.prepare_storage().await?;
//! let spec = JobSpec::new("https://cdn.example/show/ep1/index.m3u8", "ep1");
//! let outcome = sequencer.run_job(&spec, &mut NullMonitor).await;
//! println!("{}: {} segments", outcome.job_id, outcome.segments_persisted);
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod budget;
pub mod client;
pub mod dispatcher;
pub mod manifest;
pub mod models;
pub mod mux;
pub mod retry;
pub mod sequencer;

// Re-export main public API
pub use assembly::{GapPolicy, ReassemblyOrderer};
pub use budget::{BudgetPermit, ConcurrencyBudget};
pub use client::{ClientConfig, HlsClient, SegmentPayload};
pub use dispatcher::{BarrierOutcome, CompletionBarrier, SegmentDispatcher};
pub use manifest::{read_job_queue, Manifest, SegmentReference};
pub use models::{parse_queue_line, JobOutcome, JobSpec, JobStage, SegmentResult};
pub use mux::{Muxer, MuxerConfig};
pub use retry::RetryPolicy;
pub use sequencer::{JobMonitor, JobSequencer, NullMonitor, SequencerConfig, StorageConfig};
