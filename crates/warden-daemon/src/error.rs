//! Daemon-related errors.
//!
//! [`DaemonError`] is fatal: it ends startup and the process exits with
//! [`FATAL_EXIT_CODE`]. [`WorkError`] is recoverable: the execution loop logs
//! it and stops gracefully.

use std::path::PathBuf;

use thiserror::Error;
use warden_config::ConfigError;

/// Process exit status for fatal startup errors.
pub const FATAL_EXIT_CODE: i32 = -1;

/// Fatal errors raised while starting or detaching the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The platform lacks a required facility.
    #[error("{0}")]
    Environment(String),

    /// PID file exists and holds a non-zero PID.
    #[error("Daemon already running (PID file: {path}, PID: {pid})")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    /// Process fork failed.
    #[error("Failed to fork process: {0}")]
    ForkFailed(String),

    /// setsid failed in the child.
    #[error("Failed to become session leader: {0}")]
    SessionFailed(String),

    /// The PID could not be recorded.
    #[error("Failed to write PID file at {path}")]
    PidFileWrite { path: PathBuf },

    /// Failed to set up signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// The async runtime could not be built.
    #[error("Failed to start runtime: {0}")]
    Runtime(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a work unit.
#[derive(Debug, Error)]
pub enum WorkError {
    /// The work unit returned an error.
    #[error("{0}")]
    Failed(String),

    /// The work unit panicked.
    #[error("work unit panicked: {0}")]
    Panicked(String),

    /// Any other error source.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkError {
    /// Build a [`WorkError::Failed`] from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        WorkError::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_error() {
        let err = DaemonError::AlreadyRunning {
            path: PathBuf::from("/tmp/test.pid"),
            pid: 12345,
        };
        let msg = err.to_string();
        assert!(msg.contains("already running"));
        assert!(msg.contains("12345"));
    }

    #[test]
    fn test_environment_message_is_verbatim() {
        let err = DaemonError::Environment("Windows is not supported.".to_string());
        assert_eq!(err.to_string(), "Windows is not supported.");
    }

    #[test]
    fn test_session_failed() {
        let err = DaemonError::SessionFailed("EPERM".to_string());
        assert!(err.to_string().contains("session leader"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let daemon_err: DaemonError = io_err.into();
        assert!(daemon_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_work_error_msg() {
        let err = WorkError::msg("database unreachable");
        assert_eq!(err.to_string(), "database unreachable");
    }

    #[test]
    fn test_work_error_from_boxed() {
        let source: Box<dyn std::error::Error + Send + Sync> = "boom".into();
        let err = WorkError::from(source);
        assert_eq!(err.to_string(), "boom");
    }
}
