//! HTTP client for manifest and segment downloads
//!
//! The client owns the retry loop for segment fetches: one GET per attempt,
//! classified into transport/status/body-read failures, each recovered by
//! waiting out the policy's backoff. Manifest fetches are single-attempt;
//! a failed manifest aborts only its job.

pub mod config;

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::retry::RetryPolicy;
use crate::errors::{DownloadError, DownloadResult, ManifestError, ManifestResult};

pub use config::ClientConfig;

/// Bytes fetched for one segment, with observability metadata
#[derive(Debug)]
pub struct SegmentPayload {
    /// Raw segment bytes
    pub bytes: Vec<u8>,
    /// Wall-clock time from first attempt to success
    pub elapsed: Duration,
    /// Attempts consumed (1 = first try succeeded)
    pub attempts: u32,
}

/// HTTP client for playlist manifests and media segments
#[derive(Debug, Clone)]
pub struct HlsClient {
    client: Client,
    retry: RetryPolicy,
}

impl HlsClient {
    /// Create a client from configuration and a retry policy
    pub fn new(config: ClientConfig, retry: RetryPolicy) -> DownloadResult<Self> {
        retry.validate()?;
        let client = config.build_http_client()?;
        Ok(Self { client, retry })
    }

    /// Create a client with default configuration and infinite retry
    pub fn with_defaults() -> DownloadResult<Self> {
        Self::new(ClientConfig::default(), RetryPolicy::default())
    }

    /// The retry policy this client applies to segment fetches
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Download a playlist manifest body
    ///
    /// Single attempt by design: manifest failures abort the job rather
    /// than stall it, and the job driver moves on to the next entry.
    pub async fn fetch_manifest(&self, url: &Url) -> ManifestResult<String> {
        debug!("Fetching manifest from {}", url);

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ManifestError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!("Manifest fetched ({} bytes)", body.len());
        Ok(body)
    }

    /// Fetch one segment's bytes, retrying per the configured policy
    ///
    /// `ordinal` and `total` are used for logging only; they never influence
    /// control flow. With an unbounded policy this call does not return
    /// until the segment is fetched.
    pub async fn fetch_segment(
        &self,
        url: &Url,
        ordinal: usize,
        total: usize,
        job_id: &str,
    ) -> DownloadResult<SegmentPayload> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            match self.attempt_segment(url).await {
                Ok(bytes) => {
                    let elapsed = started.elapsed();
                    attempts += 1;
                    info!(
                        "Job {}: segment {}/{} from {} fetched in {:.2}s",
                        job_id,
                        ordinal + 1,
                        total,
                        url,
                        elapsed.as_secs_f64()
                    );
                    return Ok(SegmentPayload {
                        bytes,
                        elapsed,
                        attempts,
                    });
                }
                Err(e) => {
                    attempts += 1;
                    if !self.retry.allows_another_attempt(attempts) {
                        warn!(
                            "Job {}: giving up on segment {}/{} from {} after {} attempts: {}",
                            job_id,
                            ordinal + 1,
                            total,
                            url,
                            attempts,
                            e
                        );
                        return Err(DownloadError::AttemptsExhausted { attempts });
                    }

                    let delay = self.retry.next_delay();
                    warn!(
                        "Job {}: segment {}/{} from {} failed (attempt {}): {}. Retrying in {:?}",
                        job_id,
                        ordinal + 1,
                        total,
                        url,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Issue a single GET attempt for a segment
    async fn attempt_segment(&self, url: &Url) -> DownloadResult<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(DownloadError::Transport)?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(DownloadError::BodyRead)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test client construction with defaults
    #[test]
    fn test_client_creation() {
        let client = HlsClient::with_defaults().unwrap();
        assert_eq!(client.retry_policy().max_attempts, None);
    }

    /// Test client construction rejects invalid retry policies
    #[test]
    fn test_client_rejects_invalid_policy() {
        let policy = RetryPolicy {
            max_attempts: Some(0),
            ..Default::default()
        };
        let result = HlsClient::new(ClientConfig::default(), policy);
        assert!(result.is_err());
    }

    /// Test a bounded policy terminates against an unreachable host
    ///
    /// Uses a non-routable port on localhost so the connect fails fast,
    /// exercising the attempts-exhausted path without network access.
    #[tokio::test]
    async fn test_fetch_segment_exhausts_bounded_policy() {
        let config = ClientConfig {
            request_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let policy = RetryPolicy::limited(2, Duration::from_millis(10));
        let client = HlsClient::new(config, policy).unwrap();

        let url = Url::parse("http://127.0.0.1:1/seg0.ts").unwrap();
        let err = client.fetch_segment(&url, 0, 1, "test").await.unwrap_err();

        match err {
            DownloadError::AttemptsExhausted { attempts } => assert_eq!(attempts, 2),
            other => panic!("Expected AttemptsExhausted, got {:?}", other),
        }
    }
}
