//! Error types for plugsync.
//!
//! Library crates use [`PlugsyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all plugsync operations.
#[derive(Debug, thiserror::Error)]
pub enum PlugsyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a listing page.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or listing extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Structurally invalid input handed to the reconciler.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// A task with the same name already has a submission in flight.
    #[error("task '{task}' is already running")]
    AlreadyRunning { task: String },

    /// A submitted work function panicked or its worker was lost.
    #[error("worker fault: {0}")]
    WorkerFault(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlugsyncError>;

impl PlugsyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a malformed-input error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
        }
    }

    /// Create an already-running error for the named task.
    pub fn already_running(task: impl Into<String>) -> Self {
        Self::AlreadyRunning { task: task.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PlugsyncError::config("threshold out of range");
        assert_eq!(err.to_string(), "config error: threshold out of range");

        let err = PlugsyncError::already_running("scrape-plugins-site_a");
        assert_eq!(
            err.to_string(),
            "task 'scrape-plugins-site_a' is already running"
        );

        let err = PlugsyncError::malformed("override for 'akismet' has an empty name");
        assert!(err.to_string().starts_with("malformed input:"));
    }
}
