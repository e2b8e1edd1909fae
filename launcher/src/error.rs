use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Failed to list cache directory {path}: {source}")]
    CacheList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete cached file {path} ({kind}): {source}")]
    CacheDelete {
        path: PathBuf,
        kind: DeleteFailureKind,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn server process {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Server was not ready within {0:?}")]
    ReadinessTimeout(std::time::Duration),

    #[error("Server process exited before becoming ready ({0})")]
    ServerExitedEarly(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("Failed to create window: {0}")]
    WindowCreate(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Launcher has not been started")]
    NotStarted,
}

impl LauncherError {
    /// Errors that terminate the launcher instead of leaving the window up
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CacheList { .. }
                | Self::CacheDelete { .. }
                | Self::Spawn { .. }
                | Self::WindowCreate(_)
                | Self::TaskFailed(_)
        )
    }
}

/// Why deleting a cached file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteFailureKind {
    NotFound,
    PermissionDenied,
    /// Another process holds the file open
    InUse,
    Other,
}

/// Windows ERROR_SHARING_VIOLATION
const SHARING_VIOLATION: i32 = 32;

impl DeleteFailureKind {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::ResourceBusy => Self::InUse,
            _ if cfg!(windows) && err.raw_os_error() == Some(SHARING_VIOLATION) => Self::InUse,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for DeleteFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::InUse => "in use",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// What the cache cleaner does after a failed deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Count the file as skipped and keep going
    Skip,
    /// Stop cleaning and fail the launch
    Abort,
}
