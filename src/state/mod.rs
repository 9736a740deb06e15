// State module - Run statistics shared across workers
// Per test-set metrics live with each worker, the run aggregate is shared

pub mod metrics;
pub mod result;

pub use metrics::{Problem, TestSetStats};
pub use result::{ReportEntry, TestSetInfo, TestStatus};

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub completed: usize,
    pub errors: usize,
    pub failures: usize,
    pub skipped: usize,
    pub failure_sources: Vec<String>,
    pub error_sources: Vec<String>,
}

impl StatisticsSnapshot {
    /// No failures and no errors
    pub fn is_successful(&self) -> bool {
        self.errors == 0 && self.failures == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.is_successful()
    }

    /// Compare all four counters at once
    pub fn matches(&self, completed: usize, errors: usize, failures: usize, skipped: usize) -> bool {
        self.completed == completed
            && self.errors == errors
            && self.failures == failures
            && self.skipped == skipped
    }
}

/// Outcome counters for an entire run.
///
/// One instance is owned by a coordinator and shared by every manager it
/// creates. All counters sit behind a single lock so a snapshot never
/// observes a half-applied outcome.
#[derive(Debug, Default)]
pub struct RunStatistics {
    counts: Mutex<StatisticsSnapshot>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, StatisticsSnapshot> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_completed(&self) {
        self.counts().completed += 1;
    }

    pub fn record_error(&self) {
        self.counts().errors += 1;
    }

    pub fn record_failure(&self) {
        self.counts().failures += 1;
    }

    pub fn record_skipped(&self) {
        self.counts().skipped += 1;
    }

    /// Apply a finished test atomically: completed plus its outcome counter
    pub fn record_outcome(&self, status: TestStatus, source: &str) {
        let mut counts = self.counts();
        counts.completed += 1;
        match status {
            TestStatus::Success => {}
            TestStatus::Failure => {
                counts.failures += 1;
                counts.failure_sources.push(source.to_string());
            }
            TestStatus::Error => {
                counts.errors += 1;
                counts.error_sources.push(source.to_string());
            }
            TestStatus::Skipped => counts.skipped += 1,
        }
    }

    /// Merge the counts of a whole test set in one step
    pub fn record_test_set(&self, stats: &TestSetStats) {
        let mut counts = self.counts();
        counts.completed += stats.completed;
        counts.errors += stats.errors;
        counts.failures += stats.failures;
        counts.skipped += stats.skipped;
        for problem in &stats.problems {
            match problem.status {
                TestStatus::Failure => counts.failure_sources.push(problem.name.clone()),
                TestStatus::Error => counts.error_sources.push(problem.name.clone()),
                _ => {}
            }
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.counts().clone()
    }
}
