use crate::state::{ReportEntry, StatisticsSnapshot, TestSetInfo, TestSetStats};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::Reporter;

/// Emits one JSON object per lifecycle event (NDJSON)
pub struct StreamingJsonReporter {
    out: Box<dyn Write + Send>,
}

impl StreamingJsonReporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Append to the file at `path`, creating it if missing
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open JSON event stream: {}", path.display()))?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    fn emit(&mut self, event: &serde_json::Value) -> Result<()> {
        let line = serde_json::to_string(event).context("Failed to serialize event")?;
        writeln!(self.out, "{}", line).context("Failed to write event")?;
        self.out.flush().context("Failed to flush event stream")?;
        Ok(())
    }

    fn test_event(&mut self, event_type: &str, entry: &ReportEntry) -> Result<()> {
        let mut event = json!({
            "event": event_type,
            "source": entry.source,
            "testId": entry.name,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if let Some(msg) = &entry.message {
            event["message"] = json!(msg);
        }

        if let Some(elapsed) = entry.elapsed_ms {
            event["duration"] = json!(elapsed);
        }

        self.emit(&event)
    }
}

impl Reporter for StreamingJsonReporter {
    fn run_starting(&mut self) -> Result<()> {
        self.emit(&json!({
            "event": "run_start",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    fn test_set_starting(&mut self, info: &TestSetInfo) -> Result<()> {
        self.emit(&json!({
            "event": "suite_start",
            "suite": info.name,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    fn test_starting(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_event("test_start", entry)
    }

    fn test_succeeded(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_event("test_pass", entry)
    }

    fn test_failed(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_event("test_fail", entry)
    }

    fn test_error(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_event("test_error", entry)
    }

    fn test_skipped(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_event("test_skip", entry)
    }

    fn test_set_completed(&mut self, info: &TestSetInfo, stats: &TestSetStats) -> Result<()> {
        self.emit(&json!({
            "event": "suite_end",
            "suite": info.name,
            "summary": {
                "total": stats.completed,
                "failed": stats.failures,
                "errors": stats.errors,
                "skipped": stats.skipped,
                "duration": stats.elapsed_ms
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    fn run_completed(&mut self, statistics: &StatisticsSnapshot) -> Result<()> {
        self.emit(&json!({
            "event": "run_end",
            "summary": statistics,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}
