//! Install error taxonomy.

use thiserror::Error;

/// Errors that can occur during an install run.
///
/// Every failure aborts the remaining pipeline steps; nothing is retried
/// here. Retry policy, if desired, belongs to the caller.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("malformed formula: {0}")]
    MalformedDescriptor(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote resource not found: {0}")]
    NotFound(String),

    #[error("sha256 mismatch\n  expected: {expected}\n  got:      {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("build command failed (exit code: {exit_code:?})\n{stderr_tail}")]
    BuildFailure {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("smoke test failed (exit code: {exit_code:?})")]
    SmokeTestFailure { exit_code: Option<i32> },

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("another install is already running for '{0}'")]
    Locked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Process exit code for scripting consumers.
    ///
    /// `0` is success; each failure category gets a stable non-zero code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedDescriptor(_) => 2,
            Self::Network(_) => 3,
            Self::NotFound(_) => 4,
            Self::ChecksumMismatch { .. } => 5,
            Self::BuildFailure { .. } => 6,
            Self::SmokeTestFailure { .. } => 7,
            Self::UnsupportedFormat(_) | Self::Locked(_) | Self::Io(_) => 1,
        }
    }
}
