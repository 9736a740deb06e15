// Configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registry::ReporterDefinition;
use crate::stateless::StatelessListenerFactory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reporters instantiated for every worker, in order
    #[serde(default = "default_reporters")]
    pub reporters: Vec<ReporterDefinition>,

    #[serde(default)]
    pub stateless: StatelessListenerFactory,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reporters: default_reporters(),
            stateless: StatelessListenerFactory::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Enable debug output from the reporting core
    #[serde(default)]
    pub verbose: bool,
}

// Default values
pub const ENV_TESTRIG_CONFIG: &str = "TESTRIG_CONFIG";

pub fn default_reporters() -> Vec<ReporterDefinition> {
    vec![ReporterDefinition::new("console")]
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 0. $TESTRIG_CONFIG
        // 1. .testrigrc.toml (current directory)
        // 2. ~/.testrigrc.toml (home directory)
        // 3. .testrigrc.json (current directory)
        // 4. ~/.testrigrc.json (home directory)

        if let Some(path) = std::env::var_os(ENV_TESTRIG_CONFIG) {
            return Self::load_or_warn(Path::new(&path));
        }

        let cwd = std::env::current_dir().ok()?;
        let home = dirs::home_dir()?;

        let paths = [
            cwd.join(".testrigrc.toml"),
            home.join(".testrigrc.toml"),
            cwd.join(".testrigrc.json"),
            home.join(".testrigrc.json"),
        ];

        paths
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_or_warn(path))
    }

    fn load_or_warn(path: &Path) -> Option<Self> {
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring configuration {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Load configuration from a specific file, TOML unless it ends in `.json`
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse(&content)
        };
        parsed.with_context(|| format!("Invalid configuration: {}", path.display()))
    }

    /// Parse configuration from TOML string
    ///
    /// TOML has no null, so definitions with absent parameters need JSON.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Parse configuration from JSON string
    pub fn parse_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON configuration")
    }

    /// Render the configuration as TOML
    ///
    /// Fails for definitions with absent parameters, which TOML cannot express.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}
