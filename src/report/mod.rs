// Report module - Reporter capability set and built-in variants

pub mod console;
pub mod file;
pub mod junit;
pub mod streaming;

use crate::state::{ReportEntry, StatisticsSnapshot, TestSetInfo, TestSetStats};
use anyhow::Result;
pub use console::{ConsoleListener, ConsoleMode};
pub use file::FileListener;
pub use junit::JunitReporter;
pub use streaming::StreamingJsonReporter;

/// Reporter trait
///
/// A reporter is owned by exactly one `ReportManager` and only ever touched
/// by the worker thread driving that manager, hence `&mut self` and no
/// `Sync` bound. Every hook defaults to a no-op.
pub trait Reporter: Send {
    /// Called once per run, on the primary manager only
    fn run_starting(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when a worker begins a test set
    fn test_set_starting(&mut self, _info: &TestSetInfo) -> Result<()> {
        Ok(())
    }

    /// Called when a test starts
    fn test_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn test_succeeded(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn test_failed(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn test_error(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn test_skipped(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    /// Called when a worker finishes a test set
    fn test_set_completed(&mut self, _info: &TestSetInfo, _stats: &TestSetStats) -> Result<()> {
        Ok(())
    }

    /// Called once per run, on the primary manager only
    fn run_completed(&mut self, _statistics: &StatisticsSnapshot) -> Result<()> {
        Ok(())
    }
}

/// Escape text for XML attributes and bodies
pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Turn a test-set name into something safe to use as a file stem
pub(crate) fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
