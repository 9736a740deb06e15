// Tests for report writers - public API only

use std::sync::Arc;

use testrig_report::report::{JunitReporter, Reporter, StreamingJsonReporter};
use testrig_report::state::{ReportEntry, TestSetInfo, TestSetStats};
use testrig_report::{ReporterDefinition, ReporterRegistry, ReportingLifecycleCoordinator};
use walkdir::WalkDir;

fn written_files(root: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    files
}

#[test]
fn test_junit_reporter_on_empty_set() {
    // Arrange
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let mut reporter = JunitReporter::new(temp_dir.path());
    let info = TestSetInfo::new("empty.Set");

    // Act
    let result = reporter.test_set_completed(&info, &TestSetStats::default());

    // Assert
    assert!(result.is_ok());
    let content = std::fs::read_to_string(reporter.report_path(&info)).unwrap();
    assert!(content.contains("<testsuite name=\"empty.Set\""));
    assert!(content.contains("tests=\"0\""));
}

#[test]
fn test_junit_reporter_fails_on_unwritable_directory() {
    // Arrange
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let mut reporter = JunitReporter::new(blocker.join("reports"));

    // Act
    let result = reporter.test_set_completed(&TestSetInfo::new("S"), &TestSetStats::default());

    // Assert
    assert!(result.is_err());
}

#[test]
fn test_workers_write_one_file_per_test_set() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path().to_string_lossy().to_string();
    let coordinator = ReportingLifecycleCoordinator::new(
        vec![
            ReporterDefinition::new("junit").param(dir.as_str()),
            ReporterDefinition::new("file").param(dir.as_str()).param("-brief"),
        ],
        Arc::new(ReporterRegistry::with_defaults()),
    );

    std::thread::scope(|scope| {
        for set in ["alpha.Tests", "beta.Tests", "gamma.Tests"] {
            let coordinator = &coordinator;
            scope.spawn(move || {
                let mut manager = coordinator.create_manager().unwrap();
                let info = TestSetInfo::new(set);
                manager.test_set_starting(&info).unwrap();
                manager
                    .test_succeeded(&ReportEntry::new(set, "works").with_elapsed(3))
                    .unwrap();
                manager
                    .test_skipped(&ReportEntry::new(set, "later").with_message("not yet"))
                    .unwrap();
                manager.test_set_completed(&info).unwrap();
            });
        }
    });
    coordinator.close().unwrap();

    assert_eq!(
        written_files(temp_dir.path()),
        vec![
            "TEST-alpha.Tests.xml",
            "TEST-beta.Tests.xml",
            "TEST-gamma.Tests.xml",
            "alpha.Tests-brief.txt",
            "beta.Tests-brief.txt",
            "gamma.Tests-brief.txt",
        ]
    );
    let snapshot = coordinator.statistics().snapshot();
    assert!(snapshot.matches(6, 0, 0, 3));
    assert!(snapshot.is_successful());
}

#[test]
fn test_json_stream_records_full_run() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nested").join("events.ndjson");
    let mut reporter = StreamingJsonReporter::to_file(&path).unwrap();
    let info = TestSetInfo::new("S");

    reporter.run_starting().unwrap();
    reporter.test_set_starting(&info).unwrap();
    reporter.test_error(&ReportEntry::new("S", "t").with_message("boom")).unwrap();
    reporter.test_set_completed(&info, &TestSetStats::default()).unwrap();
    drop(reporter);

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<String> = content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(events, vec!["run_start", "suite_start", "test_error", "suite_end"]);
}
