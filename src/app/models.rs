//! Core data types for jobs and segment downloads
//!
//! This module defines the data structures that flow between the sequencer,
//! dispatcher and reassembly components: input queue entries, per-segment
//! download results and per-job outcomes.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ManifestError, ManifestResult};

/// One entry of the input queue: a manifest URL and a job identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// URL of the playlist manifest
    pub manifest_url: String,
    /// Job identifier (series/episode label); names all derived files
    pub id: String,
}

impl JobSpec {
    /// Create a job spec directly
    pub fn new(manifest_url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            id: id.into(),
        }
    }
}

/// Parse one line of the input queue
///
/// Lines are whitespace-separated `<manifest-url> <job-id>` pairs.
/// Backslashes in the URL are normalized to forward slashes, which tolerates
/// queue files assembled on Windows or by copy-pasting UNC-style paths.
pub fn parse_queue_line(line: &str, line_number: usize) -> ManifestResult<JobSpec> {
    let mut parts = line.split_whitespace();

    let url = parts.next().ok_or_else(|| ManifestError::InvalidJobLine {
        line_number,
        content: line.to_string(),
    })?;
    let id = parts.next().ok_or_else(|| ManifestError::InvalidJobLine {
        line_number,
        content: line.to_string(),
    })?;

    Ok(JobSpec::new(url.replace('\\', "/"), id))
}

/// Result of one segment's fetch-and-persist task
///
/// Owned by the fetch task until handed to the completion barrier.
/// `path` is `None` when the segment was dropped (retry ceiling reached or
/// the persist write failed); reassembly treats that ordinal as a gap.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    /// 0-based position within the manifest; determines final order
    pub ordinal: usize,
    /// Where the payload was persisted, if it was
    pub path: Option<PathBuf>,
    /// Payload size in bytes (0 when dropped)
    pub bytes_fetched: u64,
    /// Wall-clock time spent fetching (including retries)
    pub elapsed: Duration,
}

impl SegmentResult {
    /// Create a successful result
    pub fn persisted(ordinal: usize, path: PathBuf, bytes_fetched: u64, elapsed: Duration) -> Self {
        Self {
            ordinal,
            path: Some(path),
            bytes_fetched,
            elapsed,
        }
    }

    /// Create a dropped-segment result
    pub fn dropped(ordinal: usize, elapsed: Duration) -> Self {
        Self {
            ordinal,
            path: None,
            bytes_fetched: 0,
            elapsed,
        }
    }

    /// Whether the segment made it to persistent storage
    pub fn is_persisted(&self) -> bool {
        self.path.is_some()
    }
}

/// Stage of a job's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Queued, nothing started
    Pending,
    /// Downloading the playlist manifest
    FetchingManifest,
    /// Extracting segment references from the manifest body
    ParsingManifest,
    /// Spawning bounded fetch tasks
    Dispatching,
    /// Blocked on the completion barrier
    AwaitingCompletion,
    /// Building the ordered reassembly list and descriptor
    Reassembling,
    /// Running the external muxer
    Muxing,
    /// Removing transient files
    CleaningUp,
    /// Terminal success
    Done,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStage::Pending => "pending",
            JobStage::FetchingManifest => "fetching-manifest",
            JobStage::ParsingManifest => "parsing-manifest",
            JobStage::Dispatching => "dispatching",
            JobStage::AwaitingCompletion => "awaiting-completion",
            JobStage::Reassembling => "reassembling",
            JobStage::Muxing => "muxing",
            JobStage::CleaningUp => "cleaning-up",
            JobStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// End-of-job summary returned by the sequencer
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Job identifier
    pub job_id: String,
    /// Stage at which the job failed, if it did
    pub failed_at: Option<JobStage>,
    /// Human-readable failure description
    pub error: Option<String>,
    /// Segments listed in the manifest
    pub segments_total: usize,
    /// Segments that reached persistent storage
    pub segments_persisted: usize,
    /// Total payload bytes fetched
    pub bytes_fetched: u64,
    /// Wall-clock duration of the whole job
    pub elapsed: Duration,
    /// When the job reached its terminal state
    pub finished_at: DateTime<Utc>,
    /// Path of the muxed artifact, when muxing succeeded
    pub artifact: Option<PathBuf>,
}

impl JobOutcome {
    /// Whether the job reached its terminal success state
    pub fn is_success(&self) -> bool {
        self.failed_at.is_none()
    }

    /// Segments dropped along the way
    pub fn segments_dropped(&self) -> usize {
        self.segments_total.saturating_sub(self.segments_persisted)
    }

    /// Failure summary for a job that never produced a manifest
    pub fn failed(job_id: impl Into<String>, stage: JobStage, error: String) -> Self {
        Self {
            job_id: job_id.into(),
            failed_at: Some(stage),
            error: Some(error),
            segments_total: 0,
            segments_persisted: 0,
            bytes_fetched: 0,
            elapsed: Duration::ZERO,
            finished_at: Utc::now(),
            artifact: None,
        }
    }
}
