//! Bounded segment dispatch and completion tracking
//!
//! The dispatcher spawns one fetch task per manifest segment. Each task
//! acquires a unit of the concurrency budget before its fetch begins and
//! holds it as an RAII guard, so the unit is returned on every exit path.
//! Tasks are independent: one segment's failure never cancels siblings.
//!
//! The completion barrier wraps the spawned task set and blocks the job
//! driver until every task has terminated, success or logged failure. It
//! makes no attempt to distinguish the two; whether a gapped result may
//! proceed to muxing is the reassembly layer's policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::app::budget::ConcurrencyBudget;
use crate::app::client::HlsClient;
use crate::app::manifest::Manifest;
use crate::app::models::SegmentResult;

/// Spawns bounded fetch tasks for a manifest's segments
#[derive(Debug)]
pub struct SegmentDispatcher {
    client: Arc<HlsClient>,
    budget: ConcurrencyBudget,
    segment_dir: PathBuf,
}

impl SegmentDispatcher {
    /// Create a dispatcher writing segment payloads under `segment_dir`
    pub fn new(client: Arc<HlsClient>, budget: ConcurrencyBudget, segment_dir: PathBuf) -> Self {
        Self {
            client,
            budget,
            segment_dir,
        }
    }

    /// Launch one fetch task per segment, bounded by the budget
    ///
    /// Returns immediately with a barrier over the spawned tasks. Segment
    /// references that fail URL resolution are recorded as dropped without
    /// spawning a task.
    pub fn dispatch(&self, manifest: &Manifest, job_timeout: Option<Duration>) -> CompletionBarrier {
        let total = manifest.len();
        let mut tasks = JoinSet::new();
        let mut early = Vec::new();

        for segment in &manifest.segments {
            let url = match manifest.segment_url(segment) {
                Ok(url) => url,
                Err(e) => {
                    warn!(
                        "Job {}: segment {} has unresolvable reference {:?}: {}",
                        manifest.id, segment.ordinal, segment.reference, e
                    );
                    early.push(SegmentResult::dropped(segment.ordinal, Duration::ZERO));
                    continue;
                }
            };

            let client = Arc::clone(&self.client);
            let budget = self.budget.clone();
            let job_id = manifest.id.clone();
            let ordinal = segment.ordinal;
            let destination = self
                .segment_dir
                .join(format!("{}_{}", manifest.id, segment.basename()));

            tasks.spawn(async move {
                // Held for the whole fetch-and-persist scope; dropping it on
                // any exit path returns the unit to the budget.
                let _permit = budget.acquire().await;
                let started = Instant::now();

                let payload = match client.fetch_segment(&url, ordinal, total, &job_id).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(
                            "Job {}: segment {} dropped after fetch failure: {}",
                            job_id, ordinal, e
                        );
                        return SegmentResult::dropped(ordinal, started.elapsed());
                    }
                };

                let bytes_fetched = payload.bytes.len() as u64;
                match tokio::fs::write(&destination, &payload.bytes).await {
                    Ok(()) => {
                        debug!(
                            "Job {}: segment {} persisted to {} ({} bytes)",
                            job_id,
                            ordinal,
                            destination.display(),
                            bytes_fetched
                        );
                        SegmentResult::persisted(ordinal, destination, bytes_fetched, payload.elapsed)
                    }
                    Err(e) => {
                        // The write is not retried; the segment becomes a gap.
                        warn!(
                            "Job {}: failed to persist segment {} to {}: {}",
                            job_id,
                            ordinal,
                            destination.display(),
                            e
                        );
                        SegmentResult::dropped(ordinal, started.elapsed())
                    }
                }
            });
        }

        CompletionBarrier {
            tasks,
            early,
            total,
            timeout: job_timeout,
        }
    }
}

/// Blocks a job driver until every dispatched fetch task has terminated
#[derive(Debug)]
pub struct CompletionBarrier {
    tasks: JoinSet<SegmentResult>,
    early: Vec<SegmentResult>,
    total: usize,
    timeout: Option<Duration>,
}

/// Everything the barrier observed by the time all tasks terminated
#[derive(Debug)]
pub struct BarrierOutcome {
    /// Per-segment results in completion order (not manifest order)
    pub results: Vec<SegmentResult>,
    /// Whether the job timeout fired and aborted outstanding tasks
    pub timed_out: bool,
}

impl BarrierOutcome {
    /// Number of segments that reached persistent storage
    pub fn persisted_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_persisted()).count()
    }

    /// Total payload bytes fetched
    pub fn bytes_fetched(&self) -> u64 {
        self.results.iter().map(|r| r.bytes_fetched).sum()
    }
}

impl CompletionBarrier {
    /// Segments covered by this barrier
    pub fn total(&self) -> usize {
        self.total
    }

    /// Tasks still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for all tasks to terminate
    pub async fn wait(self) -> BarrierOutcome {
        self.wait_with(|_| {}).await
    }

    /// Wait for all tasks, invoking `observer` as each result arrives
    ///
    /// There is no partial-success short-circuit: the barrier returns only
    /// once every task has terminated, or once the optional job timeout has
    /// fired and the remaining tasks have been aborted and drained.
    pub async fn wait_with(mut self, mut observer: impl FnMut(&SegmentResult)) -> BarrierOutcome {
        let mut results = Vec::with_capacity(self.total);
        for result in self.early.drain(..) {
            observer(&result);
            results.push(result);
        }

        let deadline = self.timeout.map(|limit| tokio::time::Instant::now() + limit);
        let mut timed_out = false;

        loop {
            let joined = match deadline {
                Some(deadline) => {
                    tokio::select! {
                        joined = self.tasks.join_next() => joined,
                        _ = tokio::time::sleep_until(deadline) => {
                            warn!(
                                "Job timeout reached with {} fetch tasks outstanding; aborting them",
                                self.tasks.len()
                            );
                            timed_out = true;
                            self.tasks.abort_all();
                            // Drain whatever finished before the abort landed.
                            while let Some(joined) = self.tasks.join_next().await {
                                if let Ok(result) = joined {
                                    observer(&result);
                                    results.push(result);
                                }
                            }
                            break;
                        }
                    }
                }
                None => self.tasks.join_next().await,
            };

            match joined {
                None => break,
                Some(Ok(result)) => {
                    observer(&result);
                    results.push(result);
                }
                Some(Err(e)) if e.is_panic() => {
                    // The permit guard was dropped during unwind, so the
                    // budget is intact; the segment simply becomes a gap.
                    error!("Segment fetch task panicked: {}", e);
                }
                Some(Err(e)) => {
                    debug!("Segment fetch task cancelled: {}", e);
                }
            }
        }

        BarrierOutcome { results, timed_out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::ClientConfig;
    use crate::app::retry::RetryPolicy;

    fn unreachable_client(policy: RetryPolicy) -> Arc<HlsClient> {
        let config = ClientConfig {
            request_timeout: Duration::from_millis(300),
            connect_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        Arc::new(HlsClient::new(config, policy).unwrap())
    }

    fn unreachable_manifest(segments: usize) -> Manifest {
        let body: String = (0..segments)
            .map(|i| format!("seg{}.ts\n", i))
            .collect();
        Manifest::parse("test", "http://127.0.0.1:1/index.m3u8", &body).unwrap()
    }

    /// Test the barrier reports every dispatched task, failures included
    ///
    /// With a bounded retry policy against an unreachable host, every
    /// segment must terminate as a dropped result and the barrier must
    /// still account for all of them.
    #[tokio::test]
    async fn test_barrier_collects_all_failures() {
        let dir = tempfile::tempdir().unwrap();
        let client = unreachable_client(RetryPolicy::limited(1, Duration::from_millis(1)));
        let budget = ConcurrencyBudget::new(3).unwrap();
        let dispatcher = SegmentDispatcher::new(client, budget, dir.path().to_path_buf());

        let manifest = unreachable_manifest(5);
        let barrier = dispatcher.dispatch(&manifest, None);
        assert_eq!(barrier.total(), 5);

        let outcome = barrier.wait().await;
        assert_eq!(outcome.results.len(), 5);
        assert_eq!(outcome.persisted_count(), 0);
        assert!(!outcome.timed_out);
    }

    /// Test the observer sees one callback per terminated task
    #[tokio::test]
    async fn test_barrier_observer_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let client = unreachable_client(RetryPolicy::limited(1, Duration::from_millis(1)));
        let budget = ConcurrencyBudget::new(2).unwrap();
        let dispatcher = SegmentDispatcher::new(client, budget, dir.path().to_path_buf());

        let manifest = unreachable_manifest(4);
        let barrier = dispatcher.dispatch(&manifest, None);

        let mut seen = 0;
        let outcome = barrier.wait_with(|_| seen += 1).await;
        assert_eq!(seen, 4);
        assert_eq!(outcome.results.len(), 4);
    }

    /// Test the job timeout aborts stalled fetch tasks
    ///
    /// An infinite retry policy against an unreachable host would stall
    /// forever; the timeout must fire, abort the tasks, and report the
    /// truncated result set.
    #[tokio::test]
    async fn test_job_timeout_aborts_stalled_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let client = unreachable_client(RetryPolicy::infinite(Duration::from_secs(60)));
        let budget = ConcurrencyBudget::new(2).unwrap();
        let dispatcher = SegmentDispatcher::new(client, budget, dir.path().to_path_buf());

        let manifest = unreachable_manifest(3);
        let barrier = dispatcher.dispatch(&manifest, Some(Duration::from_millis(200)));

        let outcome = barrier.wait().await;
        assert!(outcome.timed_out);
        assert_eq!(outcome.persisted_count(), 0);
    }

    /// Test unresolvable references become immediate gaps
    #[tokio::test]
    async fn test_unresolvable_reference_is_dropped_early() {
        let dir = tempfile::tempdir().unwrap();
        let client = unreachable_client(RetryPolicy::limited(1, Duration::from_millis(1)));
        let budget = ConcurrencyBudget::new(2).unwrap();
        let dispatcher = SegmentDispatcher::new(client, budget, dir.path().to_path_buf());

        // A malformed absolute URL cannot be resolved against the base.
        let manifest = Manifest::parse(
            "test",
            "http://127.0.0.1:1/index.m3u8",
            "http://[invalid/seg0.ts\n",
        )
        .unwrap();

        let barrier = dispatcher.dispatch(&manifest, None);
        let outcome = barrier.wait().await;
        assert_eq!(outcome.results.len(), 1);
        assert!(!outcome.results[0].is_persisted());
    }
}
