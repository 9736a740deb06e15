// Report manager - per-worker bundle of reporters sharing the run statistics

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::report::Reporter;
use crate::state::{ReportEntry, RunStatistics, TestSetInfo, TestSetStats, TestStatus};

/// Identifies a manager within its coordinator, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(pub(crate) u64);

impl ManagerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manager-{}", self.0)
    }
}

type ReporterSet = Arc<Mutex<Vec<Box<dyn Reporter>>>>;

fn dispatch<F>(reporters: &ReporterSet, hook: &'static str, mut call: F) -> Result<()>
where
    F: FnMut(&mut dyn Reporter) -> anyhow::Result<()>,
{
    // Uncontended except on the primary, whose set the coordinator co-owns
    let mut reporters: MutexGuard<'_, Vec<Box<dyn Reporter>>> =
        reporters.lock().unwrap_or_else(PoisonError::into_inner);
    for reporter in reporters.iter_mut() {
        call(reporter.as_mut()).map_err(|e| Error::listener(hook, e))?;
    }
    Ok(())
}

/// Run-level hooks of the primary manager, held by the coordinator
#[derive(Clone)]
pub(crate) struct LifecycleHandle {
    id: ManagerId,
    reporters: ReporterSet,
    statistics: Arc<RunStatistics>,
}

impl LifecycleHandle {
    pub(crate) fn id(&self) -> ManagerId {
        self.id
    }

    pub(crate) fn run_starting(&self) -> Result<()> {
        debug!("Run starting on {}", self.id);
        dispatch(&self.reporters, "run_starting", |r| r.run_starting())
    }

    pub(crate) fn run_completed(&self) -> Result<()> {
        let snapshot = self.statistics.snapshot();
        debug!(
            "Run completed on {} ({} tests, {} failures, {} errors)",
            self.id, snapshot.completed, snapshot.failures, snapshot.errors
        );
        dispatch(&self.reporters, "run_completed", |r| {
            r.run_completed(&snapshot)
        })
    }
}

/// Delivers test events to a fixed, ordered set of reporters and reflects
/// outcomes into the shared run statistics.
///
/// A manager belongs to one worker thread for the duration of a test-set
/// execution; it is `Send` but not meant to be shared.
///
/// Every dispatch takes a per-manager lock on the reporter set. The lock
/// exists so the coordinator can reach the primary's reporters on `close`;
/// outside of that call it is never contended.
pub struct ReportManager {
    id: ManagerId,
    primary: bool,
    reporters: ReporterSet,
    statistics: Arc<RunStatistics>,
    current: TestSetStats,
}

impl ReportManager {
    pub(crate) fn new(
        id: ManagerId,
        reporters: Vec<Box<dyn Reporter>>,
        statistics: Arc<RunStatistics>,
    ) -> Self {
        Self {
            id,
            primary: false,
            reporters: Arc::new(Mutex::new(reporters)),
            statistics,
            current: TestSetStats::default(),
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Whether this manager receives the run start / stop notifications
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub(crate) fn mark_primary(&mut self) {
        self.primary = true;
    }

    pub(crate) fn lifecycle_handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            id: self.id,
            reporters: Arc::clone(&self.reporters),
            statistics: Arc::clone(&self.statistics),
        }
    }

    /// The run aggregate shared with every sibling manager
    pub fn statistics(&self) -> &Arc<RunStatistics> {
        &self.statistics
    }

    pub fn reporter_count(&self) -> usize {
        self.reporters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stats of the test set in progress (or the last one completed)
    pub fn current_test_set(&self) -> &TestSetStats {
        &self.current
    }

    pub fn test_set_starting(&mut self, info: &TestSetInfo) -> Result<()> {
        self.current = TestSetStats::default();
        dispatch(&self.reporters, "test_set_starting", |r| {
            r.test_set_starting(info)
        })
    }

    pub fn test_starting(&mut self, entry: &ReportEntry) -> Result<()> {
        dispatch(&self.reporters, "test_starting", |r| r.test_starting(entry))
    }

    pub fn test_succeeded(&mut self, entry: &ReportEntry) -> Result<()> {
        self.record(TestStatus::Success, entry);
        dispatch(&self.reporters, "test_succeeded", |r| r.test_succeeded(entry))
    }

    pub fn test_failed(&mut self, entry: &ReportEntry) -> Result<()> {
        self.record(TestStatus::Failure, entry);
        dispatch(&self.reporters, "test_failed", |r| r.test_failed(entry))
    }

    pub fn test_error(&mut self, entry: &ReportEntry) -> Result<()> {
        self.record(TestStatus::Error, entry);
        dispatch(&self.reporters, "test_error", |r| r.test_error(entry))
    }

    pub fn test_skipped(&mut self, entry: &ReportEntry) -> Result<()> {
        self.record(TestStatus::Skipped, entry);
        dispatch(&self.reporters, "test_skipped", |r| r.test_skipped(entry))
    }

    pub fn test_set_completed(&mut self, info: &TestSetInfo) -> Result<()> {
        self.current.finish();
        let stats = &self.current;
        dispatch(&self.reporters, "test_set_completed", |r| {
            r.test_set_completed(info, stats)
        })
    }

    fn record(&mut self, status: TestStatus, entry: &ReportEntry) {
        self.current.record(status, entry);
        self.statistics
            .record_outcome(status, &entry.qualified_name());
    }
}

impl fmt::Debug for ReportManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportManager")
            .field("id", &self.id)
            .field("primary", &self.primary)
            .field("reporters", &self.reporter_count())
            .finish_non_exhaustive()
    }
}
