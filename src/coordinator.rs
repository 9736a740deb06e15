// Reporting lifecycle coordinator - builds managers and fires run hooks once

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConfigurationError, Result};
use crate::manager::{LifecycleHandle, ManagerId, ReportManager};
use crate::registry::{ReporterDefinition, ReporterResolver};
use crate::report::Reporter;
use crate::state::RunStatistics;

/// Creates `ReportManager`s for the workers of one test run.
///
/// Managers and their reporters are stateful, so every worker thread gets its
/// own. All of them share one `RunStatistics`. The first manager handed out
/// becomes the primary: `run_starting` fires on it before it is returned and
/// `close` fires `run_completed` on it.
pub struct ReportingLifecycleCoordinator {
    definitions: Vec<ReporterDefinition>,
    resolver: Arc<dyn ReporterResolver>,
    statistics: Arc<RunStatistics>,
    primary: Mutex<Option<LifecycleHandle>>,
    primary_assigned: AtomicBool,
    next_id: AtomicU64,
}

impl ReportingLifecycleCoordinator {
    pub fn new(definitions: Vec<ReporterDefinition>, resolver: Arc<dyn ReporterResolver>) -> Self {
        Self {
            definitions,
            resolver,
            statistics: Arc::new(RunStatistics::new()),
            primary: Mutex::new(None),
            primary_assigned: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
        }
    }

    /// Coordinator for the reporters listed in `config`
    pub fn from_config(config: &Config, resolver: Arc<dyn ReporterResolver>) -> Self {
        Self::new(config.reporters.clone(), resolver)
    }

    pub fn definitions(&self) -> &[ReporterDefinition] {
        &self.definitions
    }

    /// The run aggregate; the same instance for the coordinator's lifetime
    pub fn statistics(&self) -> &Arc<RunStatistics> {
        &self.statistics
    }

    /// Id of the primary manager, once one has been created
    pub fn primary_id(&self) -> Option<ManagerId> {
        self.slot().as_ref().map(LifecycleHandle::id)
    }

    fn slot(&self) -> MutexGuard<'_, Option<LifecycleHandle>> {
        self.primary.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a manager with a fresh reporter for every definition.
    ///
    /// Fails without returning or retaining any reporter if one definition
    /// cannot be instantiated. The first successful call elects its manager
    /// as primary and runs `run_starting` on it while holding the slot lock.
    /// Callers that raced for the slot block until the hook has finished;
    /// callers arriving after the election skip the lock entirely.
    pub fn create_manager(&self) -> Result<ReportManager> {
        let reporters = self.instantiate_reporters()?;
        let id = ManagerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut manager = ReportManager::new(id, reporters, Arc::clone(&self.statistics));
        debug!("Created {} with {} reporters", id, manager.reporter_count());

        if !self.primary_assigned.load(Ordering::Acquire) {
            let mut slot = self.slot();
            if slot.is_none() {
                manager.mark_primary();
                let handle = manager.lifecycle_handle();
                *slot = Some(handle.clone());
                self.primary_assigned.store(true, Ordering::Release);
                info!("{} elected primary, starting run", id);

                handle.run_starting()?;
            }
        }

        Ok(manager)
    }

    /// Fire `run_completed` on the primary manager, if one was ever created.
    ///
    /// There is no closed state: each call notifies again. Callers are
    /// expected to close exactly once per run.
    pub fn close(&self) -> Result<()> {
        let slot = self.slot();
        match slot.as_ref() {
            Some(handle) => {
                info!("Closing run on {}", handle.id());
                handle.run_completed()
            }
            None => {
                debug!("Close requested before any manager was created");
                Ok(())
            }
        }
    }

    fn instantiate_reporters(&self) -> Result<Vec<Box<dyn Reporter>>, ConfigurationError> {
        self.definitions
            .iter()
            .map(|definition| {
                self.resolver
                    .resolve(&definition.identifier, &definition.params)
            })
            .collect()
    }
}
