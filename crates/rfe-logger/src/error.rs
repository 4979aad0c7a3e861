//! Error types for the logger.

use thiserror::Error;

use rfe_protocol::RfeError;

/// Errors that can occur while sweeping or logging.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The analyzer session failed.
    #[error("analyzer error: {0}")]
    Rfe(#[from] RfeError),

    /// Reading the config or writing the log failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML for [`crate::LoggerConfig`].
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The Ctrl-C handler could not be installed.
    #[error("signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// The configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for logger operations.
pub type LoggerResult<T> = Result<T, LoggerError>;
