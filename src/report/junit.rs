// JUnit reporter - outputs each test set in JUnit XML format

use super::{Reporter, escape_xml, file_stem};
use crate::state::{ReportEntry, TestSetInfo, TestSetStats, TestStatus};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

struct TestCase {
    name: String,
    classname: String,
    elapsed_ms: u64,
    status: TestStatus,
    message: Option<String>,
}

/// JUnit reporter
///
/// Collects the test cases of the current set and writes
/// `TEST-<set>.xml` when the set completes.
pub struct JunitReporter {
    output_dir: PathBuf,
    cases: Vec<TestCase>,
}

impl JunitReporter {
    /// Create new JUnit reporter
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            cases: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn report_path(&self, info: &TestSetInfo) -> PathBuf {
        self.output_dir
            .join(format!("TEST-{}.xml", file_stem(&info.name)))
    }

    fn push(&mut self, entry: &ReportEntry, status: TestStatus) {
        self.cases.push(TestCase {
            name: entry.name.clone(),
            classname: entry.source.clone(),
            elapsed_ms: entry.elapsed_ms.unwrap_or(0),
            status,
            message: entry.message.clone(),
        });
    }

    fn render(&self, info: &TestSetInfo, stats: &TestSetStats) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuite name=\"{}\" time=\"{:.3}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\">\n",
            escape_xml(&info.name),
            stats.elapsed_secs(),
            stats.completed,
            stats.failures,
            stats.errors,
            stats.skipped
        ));

        for case in &self.cases {
            xml.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
                escape_xml(&case.name),
                escape_xml(&case.classname),
                case.elapsed_ms as f64 / 1000.0
            ));

            let message = case.message.as_deref().map(escape_xml);
            match case.status {
                TestStatus::Success => xml.push_str(" />\n"),
                TestStatus::Failure => {
                    let msg = message.unwrap_or_else(|| "Test failed".to_string());
                    xml.push_str(&format!(
                        ">\n    <failure message=\"{}\" type=\"AssertionError\">{}</failure>\n  </testcase>\n",
                        msg, msg
                    ));
                }
                TestStatus::Error => {
                    let msg = message.unwrap_or_else(|| "Test errored".to_string());
                    xml.push_str(&format!(
                        ">\n    <error message=\"{}\">{}</error>\n  </testcase>\n",
                        msg, msg
                    ));
                }
                TestStatus::Skipped => {
                    let msg = message.unwrap_or_else(|| "Test skipped".to_string());
                    xml.push_str(&format!(
                        ">\n    <skipped message=\"{}\" />\n  </testcase>\n",
                        msg
                    ));
                }
            }
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

impl Reporter for JunitReporter {
    fn test_set_starting(&mut self, _info: &TestSetInfo) -> Result<()> {
        self.cases.clear();
        Ok(())
    }

    fn test_succeeded(&mut self, entry: &ReportEntry) -> Result<()> {
        self.push(entry, TestStatus::Success);
        Ok(())
    }

    fn test_failed(&mut self, entry: &ReportEntry) -> Result<()> {
        self.push(entry, TestStatus::Failure);
        Ok(())
    }

    fn test_error(&mut self, entry: &ReportEntry) -> Result<()> {
        self.push(entry, TestStatus::Error);
        Ok(())
    }

    fn test_skipped(&mut self, entry: &ReportEntry) -> Result<()> {
        self.push(entry, TestStatus::Skipped);
        Ok(())
    }

    fn test_set_completed(&mut self, info: &TestSetInfo, stats: &TestSetStats) -> Result<()> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create JUnit report directory: {}",
                self.output_dir.display()
            )
        })?;

        let path = self.report_path(info);
        let xml = self.render(info, stats);
        self.cases.clear();

        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create JUnit report file: {}", path.display()))?;

        file.write_all(xml.as_bytes())
            .context("Failed to write JUnit XML content")?;

        Ok(())
    }
}
