//! Per-manifest job orchestration
//!
//! The sequencer drives one job at a time through its lifecycle: manifest
//! fetch, parse, bounded dispatch, completion barrier, ordered reassembly,
//! muxing and cleanup. Jobs are strictly sequential; the next job's
//! dispatch does not begin until the current job's barrier has returned and
//! reassembly has finished. No job failure stops the run: the only way the
//! whole run ends is exhausting the input queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::assembly::{GapPolicy, ReassemblyOrderer};
use crate::app::budget::ConcurrencyBudget;
use crate::app::client::HlsClient;
use crate::app::dispatcher::SegmentDispatcher;
use crate::app::manifest::Manifest;
use crate::app::models::{JobOutcome, JobSpec, JobStage, SegmentResult};
use crate::app::mux::Muxer;
use crate::constants::files;
use crate::errors::{ManifestResult, Result};

/// Explicit storage layout for a sequencer
///
/// All working locations are passed in at construction; nothing is
/// discovered from the ambient filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory receiving raw segment bytes
    pub segment_dir: PathBuf,
    /// Directory receiving manifests, descriptors and muxed artifacts
    pub artifact_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            segment_dir: PathBuf::from(files::SEGMENT_DIR),
            artifact_dir: PathBuf::from(files::ARTIFACT_DIR),
        }
    }
}

impl StorageConfig {
    /// Path of the persisted manifest for a job
    pub fn manifest_path(&self, job_id: &str) -> PathBuf {
        self.artifact_dir
            .join(format!("{}{}", job_id, files::MANIFEST_SUFFIX))
    }

    /// Path of the transient concat descriptor for a job
    pub fn descriptor_path(&self, job_id: &str) -> PathBuf {
        self.artifact_dir
            .join(format!("{}{}", job_id, files::DESCRIPTOR_SUFFIX))
    }

    /// Path of the muxed artifact for a job
    pub fn artifact_path(&self, job_id: &str, extension: &str) -> PathBuf {
        self.artifact_dir.join(format!("{}.{}", job_id, extension))
    }
}

/// Sequencer behavior knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// What to do when segments are missing at reassembly time
    pub gap_policy: GapPolicy,
    /// Optional wall-clock bound on one job's segment phase
    #[serde(with = "humantime_serde")]
    pub job_timeout: Option<Duration>,
    /// Container extension of the muxed artifact
    pub artifact_extension: String,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            gap_policy: GapPolicy::default(),
            job_timeout: None,
            artifact_extension: files::ARTIFACT_EXTENSION.to_string(),
        }
    }
}

/// Observer for job progress, implemented by the CLI progress display
pub trait JobMonitor {
    /// A job's manifest parsed; segment work is about to start
    fn job_started(&mut self, _job_id: &str, _total_segments: usize) {}

    /// One segment's fetch task terminated
    fn segment_finished(&mut self, _result: &SegmentResult) {}

    /// A job reached a terminal state
    fn job_finished(&mut self, _outcome: &JobOutcome) {}
}

/// Monitor that ignores everything (library use and tests)
#[derive(Debug, Default)]
pub struct NullMonitor;

impl JobMonitor for NullMonitor {}

/// Drives jobs through their lifecycle, one manifest at a time
#[derive(Debug)]
pub struct JobSequencer {
    client: Arc<HlsClient>,
    budget: ConcurrencyBudget,
    muxer: Muxer,
    storage: StorageConfig,
    config: SequencerConfig,
}

impl JobSequencer {
    /// Create a sequencer from its collaborators and explicit storage layout
    pub fn new(
        client: Arc<HlsClient>,
        budget: ConcurrencyBudget,
        muxer: Muxer,
        storage: StorageConfig,
        config: SequencerConfig,
    ) -> Self {
        Self {
            client,
            budget,
            muxer,
            storage,
            config,
        }
    }

    /// Storage layout in use
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Create the working directories
    pub async fn prepare_storage(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.storage.segment_dir).await?;
        tokio::fs::create_dir_all(&self.storage.artifact_dir).await?;
        Ok(())
    }

    /// Process the whole input queue strictly sequentially
    ///
    /// An unparseable queue line aborts only its own entry; the run
    /// continues with the next line.
    pub async fn run_queue(
        &self,
        entries: Vec<ManifestResult<JobSpec>>,
        monitor: &mut dyn JobMonitor,
    ) -> Vec<JobOutcome> {
        let total_jobs = entries.len();
        let mut outcomes = Vec::with_capacity(total_jobs);

        for (index, entry) in entries.into_iter().enumerate() {
            let outcome = match entry {
                Ok(spec) => self.run_job(&spec, monitor).await,
                Err(e) => {
                    error!("Skipping unparseable input line: {}", e);
                    JobOutcome::failed("invalid-line", JobStage::Pending, e.to_string())
                }
            };

            info!(
                "Finished job {} ({}) in {:.2}s. {} jobs remaining.",
                outcome.job_id,
                if outcome.is_success() { "ok" } else { "failed" },
                outcome.elapsed.as_secs_f64(),
                total_jobs - index - 1
            );
            monitor.job_finished(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Drive a single job to a terminal state
    pub async fn run_job(&self, spec: &JobSpec, monitor: &mut dyn JobMonitor) -> JobOutcome {
        let started = Instant::now();
        let manifest_path = self.storage.manifest_path(&spec.id);

        // fetching-manifest
        info!(
            "Job {}: fetching manifest from {}",
            spec.id, spec.manifest_url
        );
        let manifest_url = match Url::parse(&spec.manifest_url) {
            Ok(url) => url,
            Err(_) => {
                warn!("Job {}: invalid manifest URL {}", spec.id, spec.manifest_url);
                return JobOutcome::failed(
                    &spec.id,
                    JobStage::FetchingManifest,
                    format!("invalid manifest URL: {}", spec.manifest_url),
                );
            }
        };

        let body = match self.client.fetch_manifest(&manifest_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Job {}: manifest fetch failed: {}", spec.id, e);
                return JobOutcome::failed(&spec.id, JobStage::FetchingManifest, e.to_string());
            }
        };

        // The playlist is kept on disk for the duration of the job and
        // removed during cleanup, mirroring the segment lifecycle.
        if let Err(e) = tokio::fs::write(&manifest_path, &body).await {
            warn!("Job {}: failed to persist manifest: {}", spec.id, e);
            return JobOutcome::failed(&spec.id, JobStage::FetchingManifest, e.to_string());
        }

        // parsing-manifest
        let manifest = match Manifest::parse(&spec.id, &spec.manifest_url, &body) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Job {}: manifest parse failed: {}", spec.id, e);
                remove_quietly(&manifest_path).await;
                return JobOutcome::failed(&spec.id, JobStage::ParsingManifest, e.to_string());
            }
        };
        info!("Job {}: {} segments parsed", spec.id, manifest.len());
        monitor.job_started(&spec.id, manifest.len());

        // dispatching
        let dispatcher = SegmentDispatcher::new(
            Arc::clone(&self.client),
            self.budget.clone(),
            self.storage.segment_dir.clone(),
        );
        let barrier = dispatcher.dispatch(&manifest, self.config.job_timeout);

        // awaiting-completion
        let barrier_outcome = barrier
            .wait_with(|result| monitor.segment_finished(result))
            .await;
        let segments_persisted = barrier_outcome.persisted_count();
        let bytes_fetched = barrier_outcome.bytes_fetched();
        info!(
            "Job {}: {} of {} segments persisted",
            spec.id,
            segments_persisted,
            manifest.len()
        );

        let finish = |failed_at: Option<JobStage>, error: Option<String>, artifact: Option<PathBuf>| {
            JobOutcome {
                job_id: spec.id.clone(),
                failed_at,
                error,
                segments_total: manifest.len(),
                segments_persisted,
                bytes_fetched,
                elapsed: started.elapsed(),
                finished_at: chrono::Utc::now(),
                artifact,
            }
        };

        if barrier_outcome.timed_out {
            self.cleanup(&manifest_path, None, &barrier_outcome.results)
                .await;
            return finish(
                Some(JobStage::AwaitingCompletion),
                Some("job timeout reached before all segments terminated".to_string()),
                None,
            );
        }

        // reassembling
        let orderer = ReassemblyOrderer::new(self.config.gap_policy);
        let ordered = match orderer.order(manifest.len(), &barrier_outcome.results) {
            Ok(ordered) => ordered,
            Err(e) => {
                warn!("Job {}: reassembly refused: {}", spec.id, e);
                self.cleanup(&manifest_path, None, &barrier_outcome.results)
                    .await;
                return finish(Some(JobStage::Reassembling), Some(e.to_string()), None);
            }
        };

        let descriptor_path = self.storage.descriptor_path(&spec.id);
        if let Err(e) = orderer.write_descriptor(&descriptor_path, &ordered).await {
            warn!("Job {}: descriptor write failed: {}", spec.id, e);
            self.cleanup(&manifest_path, Some(&descriptor_path), &barrier_outcome.results)
                .await;
            return finish(Some(JobStage::Reassembling), Some(e.to_string()), None);
        }

        // muxing
        let artifact_path = self
            .storage
            .artifact_path(&spec.id, &self.config.artifact_extension);
        let mux_result = self.muxer.mux(&descriptor_path, &artifact_path).await;

        // cleaning-up: runs whether muxing succeeded or not, so transient
        // files never outlive the job.
        self.cleanup(&manifest_path, Some(&descriptor_path), &barrier_outcome.results)
            .await;

        match mux_result {
            Ok(()) => finish(None, None, Some(artifact_path)),
            Err(e) => finish(Some(JobStage::Muxing), Some(e.to_string()), None),
        }
    }

    /// Remove a job's transient files: manifest, descriptor, raw segments
    async fn cleanup(
        &self,
        manifest_path: &Path,
        descriptor_path: Option<&Path>,
        results: &[SegmentResult],
    ) {
        remove_quietly(manifest_path).await;

        if let Some(descriptor) = descriptor_path {
            remove_quietly(descriptor).await;
        }

        for result in results {
            if let Some(path) = &result.path {
                remove_quietly(path).await;
            }
        }
        debug!("Cleanup finished for {}", manifest_path.display());
    }
}

/// Remove a file, logging anything other than it already being gone
async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::ClientConfig;
    use crate::app::mux::MuxerConfig;
    use crate::app::retry::RetryPolicy;

    fn test_sequencer(storage: StorageConfig) -> JobSequencer {
        let config = ClientConfig {
            request_timeout: Duration::from_millis(300),
            connect_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        let client = Arc::new(
            HlsClient::new(config, RetryPolicy::limited(1, Duration::from_millis(1))).unwrap(),
        );
        JobSequencer::new(
            client,
            ConcurrencyBudget::new(2).unwrap(),
            Muxer::new(MuxerConfig::with_program("true")),
            storage,
            SequencerConfig::default(),
        )
    }

    /// Test storage path derivation
    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            segment_dir: PathBuf::from("/work/ts"),
            artifact_dir: PathBuf::from("/work/film"),
        };

        assert_eq!(
            storage.manifest_path("ep1"),
            PathBuf::from("/work/film/ep1.m3u8")
        );
        assert_eq!(
            storage.descriptor_path("ep1"),
            PathBuf::from("/work/film/ep1_filelist.txt")
        );
        assert_eq!(
            storage.artifact_path("ep1", "mp4"),
            PathBuf::from("/work/film/ep1.mp4")
        );
    }

    /// Test an invalid manifest URL fails the job at the fetch stage
    #[tokio::test]
    async fn test_invalid_manifest_url_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            segment_dir: dir.path().join("ts"),
            artifact_dir: dir.path().join("film"),
        };
        let sequencer = test_sequencer(storage);
        sequencer.prepare_storage().await.unwrap();

        let spec = JobSpec::new("not a url", "ep1");
        let outcome = sequencer.run_job(&spec, &mut NullMonitor).await;

        assert_eq!(outcome.failed_at, Some(JobStage::FetchingManifest));
        assert!(!outcome.is_success());
    }

    /// Test an unreachable manifest host aborts only the affected job
    #[tokio::test]
    async fn test_unreachable_manifest_fails_job_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            segment_dir: dir.path().join("ts"),
            artifact_dir: dir.path().join("film"),
        };
        let sequencer = test_sequencer(storage);
        sequencer.prepare_storage().await.unwrap();

        let entries = vec![
            Ok(JobSpec::new("http://127.0.0.1:1/index.m3u8", "ep1")),
            Ok(JobSpec::new("http://127.0.0.1:1/index.m3u8", "ep2")),
        ];
        let outcomes = sequencer.run_queue(entries, &mut NullMonitor).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].failed_at, Some(JobStage::FetchingManifest));
        assert_eq!(outcomes[1].job_id, "ep2");
    }

    /// Test unparseable queue entries are reported without stopping the run
    #[tokio::test]
    async fn test_invalid_queue_entry_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            segment_dir: dir.path().join("ts"),
            artifact_dir: dir.path().join("film"),
        };
        let sequencer = test_sequencer(storage);
        sequencer.prepare_storage().await.unwrap();

        let entries = vec![Err(crate::errors::ManifestError::InvalidJobLine {
            line_number: 1,
            content: "broken".to_string(),
        })];
        let outcomes = sequencer.run_queue(entries, &mut NullMonitor).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].failed_at, Some(JobStage::Pending));
    }
}
