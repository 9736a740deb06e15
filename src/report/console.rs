// Console listener - test-set summaries on a console logger

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::Reporter;
use crate::stateless::ConsoleLogger;
use crate::state::{ReportEntry, StatisticsSnapshot, TestSetInfo, TestSetStats};

/// Console output detail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    /// One summary line per test set
    #[default]
    Brief,
    /// Summary plus one line per test
    Plain,
}

impl FromStr for ConsoleMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "brief" => Ok(Self::Brief),
            "plain" => Ok(Self::Plain),
            _ => bail!("Unknown console mode '{}', expected 'brief' or 'plain'", s),
        }
    }
}

/// Console-bound test-set listener
pub struct ConsoleListener {
    logger: Arc<dyn ConsoleLogger>,
    mode: ConsoleMode,
}

impl ConsoleListener {
    pub fn new(logger: Arc<dyn ConsoleLogger>, mode: ConsoleMode) -> Self {
        Self { logger, mode }
    }

    pub fn mode(&self) -> ConsoleMode {
        self.mode
    }

    fn test_line(&self, entry: &ReportEntry, suffix: &str) {
        if !matches!(self.mode, ConsoleMode::Plain) {
            return;
        }

        let elapsed = entry.elapsed_ms.unwrap_or(0) as f64 / 1000.0;
        let line = format!(
            "  {}({})  Time elapsed: {:.3} s{}",
            entry.name, entry.source, elapsed, suffix
        );
        if suffix.is_empty() {
            self.logger.info(&line);
        } else {
            self.logger.warning(&line);
        }
    }
}

/// `Tests run: ..` line shared by console and file listeners
pub(crate) fn summary_line(info: &TestSetInfo, stats: &TestSetStats) -> String {
    let mut line = format!(
        "Tests run: {}, Failures: {}, Errors: {}, Skipped: {}, Time elapsed: {:.3} s",
        stats.completed,
        stats.failures,
        stats.errors,
        stats.skipped,
        stats.elapsed_secs()
    );
    if stats.has_problems() {
        line.push_str(" <<< FAILURE!");
    }
    line.push_str(" - in ");
    line.push_str(&info.name);
    line
}

impl Reporter for ConsoleListener {
    fn test_set_starting(&mut self, info: &TestSetInfo) -> Result<()> {
        self.logger.info(&format!("Running {}", info.name));
        Ok(())
    }

    fn test_succeeded(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_line(entry, "");
        Ok(())
    }

    fn test_failed(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_line(entry, "  <<< FAILURE!");
        Ok(())
    }

    fn test_error(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_line(entry, "  <<< ERROR!");
        Ok(())
    }

    fn test_skipped(&mut self, entry: &ReportEntry) -> Result<()> {
        self.test_line(entry, "  <<< SKIPPED");
        Ok(())
    }

    fn test_set_completed(&mut self, info: &TestSetInfo, stats: &TestSetStats) -> Result<()> {
        let line = summary_line(info, stats);
        if stats.has_problems() {
            self.logger.error(&line);
        } else {
            self.logger.info(&line);
        }
        Ok(())
    }

    fn run_completed(&mut self, statistics: &StatisticsSnapshot) -> Result<()> {
        self.logger.info("");
        self.logger.info("Results:");
        self.logger.info("");

        if !statistics.failure_sources.is_empty() {
            self.logger.error("Failures: ");
            for source in &statistics.failure_sources {
                self.logger.error(&format!("  {}", source));
            }
        }
        if !statistics.error_sources.is_empty() {
            self.logger.error("Errors: ");
            for source in &statistics.error_sources {
                self.logger.error(&format!("  {}", source));
            }
        }

        let totals = format!(
            "Tests run: {}, Failures: {}, Errors: {}, Skipped: {}",
            statistics.completed, statistics.failures, statistics.errors, statistics.skipped
        );
        if statistics.is_successful() {
            self.logger.info(&totals);
        } else {
            self.logger.error(&totals);
        }
        Ok(())
    }
}
