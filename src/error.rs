use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the session store and the task editor.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session file matches the given full or partial ID.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The task number is past the last checkbox line.
    #[error("Task {0} not found")]
    TaskNotFound(usize),

    /// Status value outside `active|paused|completed|archived`.
    #[error("Invalid status '{0}'. Choose from: active, paused, completed, archived")]
    InvalidStatus(String),

    /// Reading or writing the session file failed.
    #[error("Failed to write session {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The per-file lock could not be taken in time.
    #[error("Could not acquire lock for {} (timeout: {}s)", path.display(), timeout.as_secs())]
    LockTimeout { path: PathBuf, timeout: Duration },
}

impl SessionError {
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SessionError::Write {
            path: path.into(),
            source,
        }
    }

    /// Session or task lookups that matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_) | SessionError::TaskNotFound(_))
    }

    /// Failures a caller may reasonably retry.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            SessionError::Write { .. } | SessionError::LockTimeout { .. }
        )
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
