use std::path::PathBuf;

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the app-bootstrap library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("environment not configured correctly: '{}' is not an existing directory", .path.display())]
    Environment { path: PathBuf },

    #[error("config file is missing or unreadable: {}", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("config source '{source_name}' broke its contract: {reason}")]
    ConfigContractViolation { source_name: String, reason: String },

    #[error("missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("config '{filename}' does not hold a value of type {expected}")]
    ConfigTypeMismatch {
        filename: String,
        expected: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn contract(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ConfigContractViolation {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
