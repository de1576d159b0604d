//! Error types for the operator CLI.

use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] record_store::StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] field_sync::ConfigError),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
