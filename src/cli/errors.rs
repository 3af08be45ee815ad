//! CLI-specific error types

use thiserror::Error;

use crate::stream::StreamError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Stream subsystem error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Tokio runtime could not be built
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error (signals, stdout)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
