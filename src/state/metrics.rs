// Per test-set metrics, confined to the worker running the set

use chrono::Utc;
use serde::Serialize;

use super::{ReportEntry, TestStatus};

/// A failed or errored test recorded within a test set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    pub name: String,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome counts for the test set currently executing on one worker
#[derive(Debug, Clone, Serialize)]
pub struct TestSetStats {
    pub completed: usize,
    pub errors: usize,
    pub failures: usize,
    pub skipped: usize,
    pub start_time: i64,
    pub elapsed_ms: u64,
    pub problems: Vec<Problem>,
}

impl Default for TestSetStats {
    fn default() -> Self {
        Self {
            completed: 0,
            errors: 0,
            failures: 0,
            skipped: 0,
            start_time: Utc::now().timestamp_millis(),
            elapsed_ms: 0,
            problems: Vec::new(),
        }
    }
}

impl TestSetStats {
    /// Count one finished test
    pub fn record(&mut self, status: TestStatus, entry: &ReportEntry) {
        self.completed += 1;
        match status {
            TestStatus::Success => {}
            TestStatus::Failure => self.failures += 1,
            TestStatus::Error => self.errors += 1,
            TestStatus::Skipped => self.skipped += 1,
        }

        if status.is_problem() {
            self.problems.push(Problem {
                name: entry.qualified_name(),
                status,
                message: entry.message.clone(),
            });
        }
    }

    /// Freeze elapsed time at the end of the set
    pub fn finish(&mut self) {
        let now = Utc::now().timestamp_millis();
        self.elapsed_ms = now.saturating_sub(self.start_time).max(0) as u64;
    }

    pub fn has_problems(&self) -> bool {
        self.failures > 0 || self.errors > 0
    }

    /// Elapsed time in seconds, as printed by the listeners
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}
