// Report entries delivered to reporters

use serde::{Deserialize, Serialize};

/// Outcome category of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Failure,
    Error,
    Skipped,
}

impl TestStatus {
    /// Failures and errors both break the build
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Failure | Self::Error)
    }
}

/// A single test lifecycle event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Test set (class, file, group) the test belongs to
    pub source: String,
    /// Test name within the set
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl ReportEntry {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            message: None,
            elapsed_ms: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    /// `source.name`, used as the failure source in run statistics
    pub fn qualified_name(&self) -> String {
        if self.source.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.source, self.name)
        }
    }
}

/// Identifies the test set being executed by a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TestSetInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
