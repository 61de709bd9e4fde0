//! Bounded concurrency budget for segment downloads
//!
//! An explicit counting-permit pool shared by all fetch tasks of one job.
//! A permit is acquired before a segment fetch starts and released when the
//! holding guard is dropped, so release is guaranteed on every exit path,
//! including panics inside the fetch task.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::constants::budget;
use crate::errors::{DownloadError, DownloadResult};

/// Counting permit pool bounding concurrently active segment downloads
#[derive(Debug, Clone)]
pub struct ConcurrencyBudget {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// RAII guard for one unit of the budget; dropping it releases the unit
#[derive(Debug)]
pub struct BudgetPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyBudget {
    /// Create a budget with the given maximum number of in-flight downloads
    pub fn new(limit: usize) -> DownloadResult<Self> {
        if limit == 0 {
            return Err(DownloadError::Configuration(
                "Concurrency budget cannot be zero".to_string(),
            ));
        }

        if limit > budget::MAX_BUDGET {
            return Err(DownloadError::Configuration(format!(
                "Concurrency budget ({}) exceeds maximum ({})",
                limit,
                budget::MAX_BUDGET
            )));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Acquire one unit, waiting until one is free
    pub async fn acquire(&self) -> BudgetPermit {
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("concurrency budget semaphore closed");

        BudgetPermit { _permit: permit }
    }

    /// Configured maximum number of concurrent holders
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Units currently available
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
