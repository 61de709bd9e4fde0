//! Retry policy for segment downloads
//!
//! The policy is a plain value injected into the client rather than a loop
//! hardcoded at the fetch site, so callers (and tests) can bound it. The
//! default preserves the fetcher's liveness trade-off: retry forever with a
//! fixed backoff, preferring eventual completeness over forward progress
//! under persistent failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::retry;
use crate::errors::{DownloadError, DownloadResult};

/// Retry behavior for a single segment download
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` retries indefinitely
    pub max_attempts: Option<u32>,
    /// Delay between attempts
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
    /// Jitter factor applied to the backoff (0.0-1.0, 0.0 = fixed interval)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: retry::SEGMENT_BACKOFF,
            jitter_factor: retry::DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries forever with the given backoff
    pub fn infinite(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
            jitter_factor: retry::DEFAULT_JITTER_FACTOR,
        }
    }

    /// Policy with a hard attempt ceiling
    pub fn limited(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
            jitter_factor: retry::DEFAULT_JITTER_FACTOR,
        }
    }

    /// Validate policy values
    pub fn validate(&self) -> DownloadResult<()> {
        if self.max_attempts == Some(0) {
            return Err(DownloadError::Configuration(
                "max_attempts must be at least 1 when set".to_string(),
            ));
        }

        if !(0.0..=retry::MAX_JITTER_FACTOR).contains(&self.jitter_factor) {
            return Err(DownloadError::Configuration(format!(
                "jitter_factor ({}) must be between 0.0 and {}",
                self.jitter_factor,
                retry::MAX_JITTER_FACTOR
            )));
        }

        Ok(())
    }

    /// Whether another attempt is allowed after `attempts` completed attempts
    pub fn allows_another_attempt(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Delay to wait before the next attempt, with jitter applied
    pub fn next_delay(&self) -> Duration {
        let base_millis = self.backoff.as_millis() as u64;
        let jitter_range = (base_millis as f64 * self.jitter_factor) as u64;
        let jitter = if jitter_range > 0 {
            fastrand::u64(0..=jitter_range * 2).saturating_sub(jitter_range)
        } else {
            0
        };

        Duration::from_millis(base_millis.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test default policy matches the legacy behavior
    ///
    /// The default must retry indefinitely with the fixed segment backoff,
    /// because completeness is preferred over forward progress.
    #[test]
    fn test_default_policy_is_infinite() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, retry::SEGMENT_BACKOFF);
        assert!(policy.allows_another_attempt(0));
        assert!(policy.allows_another_attempt(1_000_000));
    }

    /// Test bounded policy refuses attempts past the ceiling
    #[test]
    fn test_limited_policy_exhausts() {
        let policy = RetryPolicy::limited(3, Duration::from_millis(10));
        assert!(policy.allows_another_attempt(0));
        assert!(policy.allows_another_attempt(2));
        assert!(!policy.allows_another_attempt(3));
        assert!(!policy.allows_another_attempt(4));
    }

    /// Test fixed backoff produces the exact configured delay
    #[test]
    fn test_fixed_backoff_without_jitter() {
        let policy = RetryPolicy::infinite(Duration::from_millis(500));
        assert_eq!(policy.next_delay(), Duration::from_millis(500));
    }

    /// Test jittered backoff stays within the expected band
    #[test]
    fn test_jittered_backoff_bounds() {
        let policy = RetryPolicy {
            max_attempts: None,
            backoff: Duration::from_millis(1000),
            jitter_factor: 0.5,
        };

        for _ in 0..100 {
            let delay = policy.next_delay().as_millis() as u64;
            assert!((500..=1500).contains(&delay), "delay {} out of band", delay);
        }
    }

    /// Test validation rejects nonsensical values
    #[test]
    fn test_policy_validation() {
        let policy = RetryPolicy {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetryPolicy {
            jitter_factor: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        assert!(RetryPolicy::default().validate().is_ok());
    }
}
