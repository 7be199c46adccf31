//! Error types for the capture workflow and its collaborators.

use std::path::PathBuf;

/// A required configuration value is missing or unusable
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--{0} is required")]
    Missing(&'static str),

    #[error("invalid value for --{flag}: {reason}")]
    Invalid { flag: &'static str, reason: String },
}

/// Failure of a profile store operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile name '{0}': only alphanumeric characters, hyphens (-) and underscores (_) are allowed")]
    InvalidName(String),

    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Failure to launch the external login
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while waiting for a pending capture
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("{} did not appear after {attempts} attempts", .path.display())]
    Timeout { path: PathBuf, attempts: u32 },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that aborts a capture run
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("failed to update {}: {source}", .path.display())]
    IgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
