use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use testrig_report::report::Reporter;
use testrig_report::state::{ReportEntry, StatisticsSnapshot, TestSetInfo};
use testrig_report::{
    ConfigurationError, Error, ParamType, ReporterDefinition, ReporterRegistry,
    ReportingLifecycleCoordinator,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Built(usize),
    Dropped(usize),
    RunStarting(usize),
    TestSet(usize, String),
    RunCompleted(usize, usize),
}

type EventLog = Arc<Mutex<Vec<Event>>>;

struct Probe {
    instance: usize,
    log: EventLog,
}

impl Reporter for Probe {
    fn run_starting(&mut self) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(Event::RunStarting(self.instance));
        Ok(())
    }

    fn test_set_starting(&mut self, info: &TestSetInfo) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(Event::TestSet(self.instance, info.name.clone()));
        Ok(())
    }

    fn run_completed(&mut self, statistics: &StatisticsSnapshot) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(Event::RunCompleted(self.instance, statistics.completed));
        Ok(())
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.log
            .lock()
            .unwrap()
            .push(Event::Dropped(self.instance));
    }
}

/// Registry with `probe` (always succeeds) and `broken` (always fails)
fn probe_registry(log: &EventLog) -> Arc<ReporterRegistry> {
    let registry = ReporterRegistry::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let probe_log = Arc::clone(log);
    registry.register("probe", &[], move |_| {
        let instance = counter.fetch_add(1, Ordering::SeqCst);
        probe_log.lock().unwrap().push(Event::Built(instance));
        Ok(Box::new(Probe {
            instance,
            log: Arc::clone(&probe_log),
        }))
    });

    registry.register("broken", &[ParamType::Text], |args| {
        Err(anyhow!(
            "broken reporter refused '{}'",
            args.text(0).unwrap_or("null")
        ))
    });

    Arc::new(registry)
}

fn count(log: &EventLog, pred: impl Fn(&Event) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|e| pred(e)).count()
}

#[test]
fn test_run_starting_fires_exactly_once_under_contention() {
    const WORKERS: usize = 16;

    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );
    let barrier = Barrier::new(WORKERS);

    let managers: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let coordinator = &coordinator;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    let mut manager = coordinator.create_manager().unwrap();
                    manager
                        .test_set_starting(&TestSetInfo::new(format!("worker-{}", worker)))
                        .unwrap();
                    (worker, manager)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(count(&log, |e| matches!(e, Event::RunStarting(_))), 1);

    let primaries: Vec<_> = managers.iter().filter(|(_, m)| m.is_primary()).collect();
    assert_eq!(primaries.len(), 1);
    let (primary_worker, primary) = primaries[0];
    assert_eq!(coordinator.primary_id(), Some(primary.id()));

    // the reporter that saw run_starting belongs to the primary's worker
    let events = log.lock().unwrap().clone();
    let started = events
        .iter()
        .find_map(|e| match e {
            Event::RunStarting(i) => Some(*i),
            _ => None,
        })
        .unwrap();
    assert!(events.contains(&Event::TestSet(
        started,
        format!("worker-{}", primary_worker)
    )));
}

#[test]
fn test_start_hook_completes_before_first_caller_returns() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );

    let manager = coordinator.create_manager().unwrap();

    assert!(manager.is_primary());
    assert_eq!(*log.lock().unwrap(), vec![Event::Built(0), Event::RunStarting(0)]);
}

#[test]
fn test_managers_share_one_statistics_aggregate() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );

    let mut first = coordinator.create_manager().unwrap();
    let second = coordinator.create_manager().unwrap();

    assert!(Arc::ptr_eq(first.statistics(), second.statistics()));
    assert!(Arc::ptr_eq(first.statistics(), coordinator.statistics()));

    first.test_failed(&ReportEntry::new("Calc", "divides")).unwrap();

    let seen = second.statistics().snapshot();
    assert!(seen.matches(1, 0, 1, 0));
    assert_eq!(seen.failure_sources, vec!["Calc.divides".to_string()]);
}

#[test]
fn test_concurrent_workers_aggregate_into_shared_statistics() {
    const WORKERS: usize = 8;
    const TESTS: usize = 50;

    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let coordinator = &coordinator;
            scope.spawn(move || {
                let mut manager = coordinator.create_manager().unwrap();
                let info = TestSetInfo::new(format!("Set{}", worker));
                manager.test_set_starting(&info).unwrap();
                for test in 0..TESTS {
                    let entry = ReportEntry::new(info.name.clone(), format!("t{}", test));
                    if test % 10 == 0 {
                        manager.test_error(&entry).unwrap();
                    } else {
                        manager.test_succeeded(&entry).unwrap();
                    }
                }
                manager.test_set_completed(&info).unwrap();
            });
        }
    });

    let snapshot = coordinator.statistics().snapshot();
    assert!(snapshot.matches(WORKERS * TESTS, WORKERS * TESTS / 10, 0, 0));
    assert_eq!(snapshot.error_sources.len(), WORKERS * TESTS / 10);
}

#[test]
fn test_failed_definition_aborts_whole_manager() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![
            ReporterDefinition::new("probe"),
            ReporterDefinition::new("broken").param("target"),
            ReporterDefinition::new("probe"),
        ],
        probe_registry(&log),
    );

    let err = coordinator.create_manager().unwrap_err();

    match err {
        Error::Configuration(ConfigurationError::Construction {
            ref identifier,
            ref message,
            ..
        }) => {
            assert_eq!(identifier, "broken");
            assert_eq!(message, "broken reporter refused 'target'");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // the reporter built before the failure was released, the third never built
    let events = log.lock().unwrap().clone();
    assert_eq!(events, vec![Event::Built(0), Event::Dropped(0)]);
    assert_eq!(coordinator.primary_id(), None);
}

#[test]
fn test_unknown_identifier_is_reported_by_name() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("sonar")],
        probe_registry(&log),
    );

    let err = coordinator.create_manager().unwrap_err();

    assert!(err.to_string().contains("'sonar'"));
    match err {
        Error::Configuration(config) => assert_eq!(config.identifier(), "sonar"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_close_without_managers_is_a_no_op() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );

    coordinator.close().unwrap();

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_close_fires_on_primary_with_final_statistics() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );

    let _primary = coordinator.create_manager().unwrap();
    let mut other = coordinator.create_manager().unwrap();
    other.test_succeeded(&ReportEntry::new("S", "a")).unwrap();
    other.test_succeeded(&ReportEntry::new("S", "b")).unwrap();

    coordinator.close().unwrap();

    let completed: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, Event::RunCompleted(..)))
        .cloned()
        .collect();
    assert_eq!(completed, vec![Event::RunCompleted(0, 2)]);
}

#[test]
fn test_repeated_close_notifies_each_time() {
    // No closed state is tracked: closing once per run is the caller's job.
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("probe")],
        probe_registry(&log),
    );
    let _primary = coordinator.create_manager().unwrap();

    coordinator.close().unwrap();
    coordinator.close().unwrap();

    let completions: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::RunCompleted(instance, _) => Some(*instance),
            _ => None,
        })
        .collect();
    assert_eq!(completions, vec![0, 0]);
}

#[test]
fn test_start_hook_failure_is_returned_and_primary_kept() {
    struct FailingStart;

    impl Reporter for FailingStart {
        fn run_starting(&mut self) -> anyhow::Result<()> {
            Err(anyhow!("report server unreachable"))
        }
    }

    let registry = ReporterRegistry::new();
    registry.register("failing-start", &[], |_| Ok(Box::new(FailingStart)));
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("failing-start")],
        Arc::new(registry),
    );

    let err = coordinator.create_manager().unwrap_err();
    assert!(matches!(err, Error::Listener { hook: "run_starting", .. }));

    let next = coordinator.create_manager().unwrap();
    assert!(!next.is_primary());
    assert!(coordinator.primary_id().is_some());
}

#[test]
fn test_slow_start_hook_does_not_block_later_callers() {
    struct SlowStart {
        entered: Arc<Barrier>,
    }

    impl Reporter for SlowStart {
        fn run_starting(&mut self) -> anyhow::Result<()> {
            self.entered.wait();
            thread::sleep(Duration::from_millis(1500));
            Ok(())
        }
    }

    let entered = Arc::new(Barrier::new(2));
    let registry = ReporterRegistry::new();
    let hook_entered = Arc::clone(&entered);
    registry.register("slow-start", &[], move |_| {
        Ok(Box::new(SlowStart {
            entered: Arc::clone(&hook_entered),
        }))
    });
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("slow-start")],
        Arc::new(registry),
    );

    thread::scope(|scope| {
        let primary = scope.spawn(|| coordinator.create_manager().unwrap());

        // The primary is elected and its hook is running
        entered.wait();
        let started = Instant::now();
        let late = coordinator.create_manager().unwrap();
        let waited = started.elapsed();

        assert!(!late.is_primary());
        assert!(
            waited < Duration::from_millis(750),
            "late caller waited {:?} for the start hook",
            waited
        );
        assert!(primary.join().unwrap().is_primary());
    });
}

#[test]
fn test_construction_failure_names_identifier() {
    let log: EventLog = Arc::default();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![ReporterDefinition::new("broken").param("cfg")],
        probe_registry(&log),
    );

    let err = coordinator.create_manager().unwrap_err();

    assert_eq!(
        err.to_string(),
        "report 'broken': broken reporter refused 'cfg'"
    );
}
