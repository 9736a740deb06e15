// Error types for reporter instantiation and lifecycle dispatch

use thiserror::Error;

/// Raised when a reporter definition cannot be turned into a reporter.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No reporter variant is registered under the identifier
    #[error("Unable to find reporter to create report '{identifier}'")]
    NotFound { identifier: String },

    /// The identifier exists but none of its constructors accepts the parameter types
    #[error(
        "Unable to find appropriate constructor to create report '{identifier}': no constructor accepts ({signature})"
    )]
    NoMatchingConstructor {
        identifier: String,
        signature: String,
    },

    /// The selected constructor itself failed; its message is kept verbatim
    #[error("{message}")]
    Construction {
        identifier: String,
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ConfigurationError {
    /// Identifier of the reporter definition that failed
    pub fn identifier(&self) -> &str {
        match self {
            Self::NotFound { identifier }
            | Self::NoMatchingConstructor { identifier, .. }
            | Self::Construction { identifier, .. } => identifier,
        }
    }

    /// Message that always names the failing identifier
    fn describe(&self) -> String {
        match self {
            Self::Construction {
                identifier,
                message,
                ..
            } => format!("report '{identifier}': {message}"),
            other => other.to_string(),
        }
    }

    pub(crate) fn construction(identifier: &str, source: anyhow::Error) -> Self {
        Self::Construction {
            identifier: identifier.to_string(),
            message: source.to_string(),
            source,
        }
    }
}

/// Errors surfaced by the reporting lifecycle
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", .0.describe())]
    Configuration(#[from] ConfigurationError),

    /// A reporter failed while handling a lifecycle notification
    #[error("reporter failed during {hook}: {source}")]
    Listener {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn listener(hook: &'static str, source: anyhow::Error) -> Self {
        Self::Listener { hook, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
