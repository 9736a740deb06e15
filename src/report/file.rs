// File listener - one plain-text summary file per test set

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::console::summary_line;
use super::{Reporter, file_stem};
use crate::state::{TestSetInfo, TestSetStats, TestStatus};
use crate::stateless::Encoding;

/// File-bound test-set listener
#[derive(Debug, Clone)]
pub struct FileListener {
    directory: PathBuf,
    filename_suffix: String,
    encoding: Encoding,
}

impl FileListener {
    pub fn new(directory: impl Into<PathBuf>, filename_suffix: Option<&str>, encoding: Encoding) -> Self {
        Self {
            directory: directory.into(),
            filename_suffix: filename_suffix.unwrap_or_default().to_string(),
            encoding,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// `<dir>/<set><suffix>.txt`
    pub fn report_path(&self, info: &TestSetInfo) -> PathBuf {
        self.directory.join(format!(
            "{}{}.txt",
            file_stem(&info.name),
            self.filename_suffix
        ))
    }

    fn render(info: &TestSetInfo, stats: &TestSetStats) -> String {
        let rule = "-".repeat(79);
        let mut text = String::new();
        text.push_str(&rule);
        text.push('\n');
        text.push_str(&format!("Test set: {}\n", info.name));
        text.push_str(&rule);
        text.push('\n');
        text.push_str(&summary_line(info, stats));
        text.push('\n');

        for problem in &stats.problems {
            let marker = match problem.status {
                TestStatus::Error => "ERROR!",
                _ => "FAILURE!",
            };
            text.push_str(&format!("{}  <<< {}\n", problem.name, marker));
            if let Some(message) = &problem.message {
                text.push_str(message);
                text.push('\n');
            }
            text.push('\n');
        }
        text
    }
}

impl Reporter for FileListener {
    fn test_set_completed(&mut self, info: &TestSetInfo, stats: &TestSetStats) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "Failed to create reports directory: {}",
                self.directory.display()
            )
        })?;

        let path = self.report_path(info);
        let bytes = self.encoding.encode(&Self::render(info, stats));
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write test-set report: {}", path.display()))?;

        tracing::debug!("Wrote {} report {}", self.encoding, path.display());
        Ok(())
    }
}
