// Stateless test-set listeners: configuration, loggers and encodings

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::report::{ConsoleListener, ConsoleMode, FileListener};

/// Console sink used by console-bound listeners
pub trait ConsoleLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards console lines to the installed `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsoleLogger;

impl ConsoleLogger for TracingConsoleLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Writes straight to stdout / stderr, styling warnings and errors.
/// For harnesses that run without a tracing subscriber.
#[derive(Debug, Clone, Copy)]
pub struct StdoutConsoleLogger {
    debug: bool,
}

impl StdoutConsoleLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Styled line for `level`, or `None` when the level is suppressed
    pub fn render(&self, level: LogLevel, message: &str) -> Option<String> {
        let line = match level {
            LogLevel::Debug if !self.debug => return None,
            LogLevel::Debug => console::style(format!("[DEBUG] {}", message)).dim(),
            LogLevel::Info => console::style(format!("[INFO] {}", message)),
            LogLevel::Warning => console::style(format!("[WARNING] {}", message)).yellow(),
            LogLevel::Error => console::style(format!("[ERROR] {}", message)).red().bold(),
        };
        Some(line.to_string())
    }
}

impl Default for StdoutConsoleLogger {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConsoleLogger for StdoutConsoleLogger {
    fn debug(&self, message: &str) {
        if let Some(line) = self.render(LogLevel::Debug, message) {
            println!("{}", line);
        }
    }

    fn info(&self, message: &str) {
        if let Some(line) = self.render(LogLevel::Info, message) {
            println!("{}", line);
        }
    }

    fn warning(&self, message: &str) {
        if let Some(line) = self.render(LogLevel::Warning, message) {
            println!("{}", line);
        }
    }

    fn error(&self, message: &str) {
        if let Some(line) = self.render(LogLevel::Error, message) {
            eprintln!("{}", line);
        }
    }
}

/// Severity of a captured console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Captures console lines in memory
#[derive(Debug, Default)]
pub struct BufferedConsoleLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl BufferedConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages only, in arrival order
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, message)| message).collect()
    }
}

impl ConsoleLogger for BufferedConsoleLogger {
    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

/// Text encoding of report files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1; characters above U+00FF become `?`
    Latin1,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf16le" => Ok(Self::Utf16Le),
            "utf16be" => Ok(Self::Utf16Be),
            "iso88591" | "latin1" => Ok(Self::Latin1),
            _ => bail!("Unsupported encoding '{}'", s),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(value: Encoding) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names the execution boundary a configuration is copied into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationContext {
    name: String,
}

impl IsolationContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Configuration for stateless console and file test-set listeners.
///
/// The factory holds no per-test state: listeners it creates receive the
/// test-set statistics from their manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatelessListenerFactory {
    #[serde(default)]
    disabled: bool,

    #[serde(default)]
    console_mode: ConsoleMode,

    #[serde(default = "default_reports_directory")]
    reports_directory: PathBuf,

    #[serde(default)]
    filename_suffix: Option<String>,

    #[serde(default)]
    encoding: Encoding,
}

fn default_reports_directory() -> PathBuf {
    PathBuf::from("target/test-reports")
}

impl Default for StatelessListenerFactory {
    fn default() -> Self {
        Self {
            disabled: false,
            console_mode: ConsoleMode::default(),
            reports_directory: default_reports_directory(),
            filename_suffix: None,
            encoding: Encoding::default(),
        }
    }
}

impl StatelessListenerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_console_mode(mut self, mode: ConsoleMode) -> Self {
        self.console_mode = mode;
        self
    }

    pub fn with_file_defaults(
        mut self,
        reports_directory: impl Into<PathBuf>,
        filename_suffix: Option<String>,
        encoding: Encoding,
    ) -> Self {
        self.reports_directory = reports_directory.into();
        self.filename_suffix = filename_suffix;
        self.encoding = encoding;
        self
    }

    /// Callers skip listener creation when set
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) -> &mut Self {
        self.disabled = disabled;
        self
    }

    pub fn console_mode(&self) -> ConsoleMode {
        self.console_mode
    }

    pub fn reports_directory(&self) -> &Path {
        &self.reports_directory
    }

    pub fn filename_suffix(&self) -> Option<&str> {
        self.filename_suffix.as_deref()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn create_console_listener(&self, logger: Arc<dyn ConsoleLogger>) -> ConsoleListener {
        ConsoleListener::new(logger, self.console_mode)
    }

    pub fn create_file_listener(
        &self,
        directory: impl Into<PathBuf>,
        filename_suffix: Option<&str>,
        encoding: Encoding,
    ) -> FileListener {
        FileListener::new(directory, filename_suffix, encoding)
    }

    /// File listener using the configured directory, suffix and encoding
    pub fn create_default_file_listener(&self) -> FileListener {
        self.create_file_listener(
            self.reports_directory.clone(),
            self.filename_suffix.as_deref(),
            self.encoding,
        )
    }

    /// Copy this configuration into another isolation boundary.
    ///
    /// The copy is rebuilt from its serialized form, so nothing is shared
    /// with the original.
    pub fn clone_across(&self, context: &IsolationContext) -> Result<Self> {
        let payload = serde_json::to_vec(self)
            .context("Failed to serialize stateless listener configuration")?;
        let copy: Self = serde_json::from_slice(&payload).with_context(|| {
            format!(
                "Failed to rebuild stateless listener configuration in '{}'",
                context.name()
            )
        })?;
        debug!(
            "Copied stateless listener configuration into '{}'",
            context.name()
        );
        Ok(copy)
    }
}

impl fmt::Display for StatelessListenerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatelessListenerFactory{{disabled={}}}", self.disabled)
    }
}
