//! Error taxonomy for host bootstrap.
//!
//! Every failure a stage can report is one of these variants. [`Error::class`]
//! folds them into the three classes the pipeline cares about plus an
//! internal bucket for programming and I/O errors.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for hostprep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required fact is missing or ambiguous. Fatal, never retried.
    EnvironmentUnresolvable,
    /// Network, package manager, or checkout trouble. Retried, then escalated.
    TransientAcquisition,
    /// The external installer did not exit cleanly. Fatal, never retried.
    InstallerFailure,
    /// Misconfiguration of the pipeline itself, or local I/O.
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::EnvironmentUnresolvable => "environment unresolvable",
            ErrorClass::TransientAcquisition => "transient acquisition",
            ErrorClass::InstallerFailure => "installer failure",
            ErrorClass::Internal => "internal",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("environment unresolvable: {0}")]
    EnvironmentUnresolvable(String),

    #[error("failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", command_failed_message(.program, .code, .stderr))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("DNS lookup for {host} failed: {reason}")]
    Dns { host: String, reason: String },

    #[error("checksum mismatch for {}\n  Expected: {expected}\n  Actual:   {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{action} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        action: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("all strategies failed for {goal} (tried: {})", .links.join(", "))]
    FallbackExhausted {
        goal: String,
        links: Vec<String>,
        #[source]
        last: Box<Error>,
    },

    #[error("fallback chain for {0} has no links")]
    EmptyChain(String),

    #[error("installer {} exited with status {}", .path.display(), status_display(.code))]
    InstallerFailed { path: PathBuf, code: Option<i32> },

    #[error("installer {} could not be started: {source}", .path.display())]
    InstallerNotStarted {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("installer {} timed out after {timeout:?}", .path.display())]
    InstallerTimedOut { path: PathBuf, timeout: Duration },

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("context key '{key}' already recorded as '{existing}', refusing '{attempted}'")]
    ContextConflict {
        key: String,
        existing: String,
        attempted: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::EnvironmentUnresolvable(_) => ErrorClass::EnvironmentUnresolvable,
            Error::Spawn { .. }
            | Error::CommandFailed { .. }
            | Error::Timeout { .. }
            | Error::Dns { .. }
            | Error::ChecksumMismatch { .. }
            | Error::Exhausted { .. }
            | Error::FallbackExhausted { .. } => ErrorClass::TransientAcquisition,
            Error::InstallerFailed { .. }
            | Error::InstallerNotStarted { .. }
            | Error::InstallerTimedOut { .. } => ErrorClass::InstallerFailure,
            Error::EmptyChain(_)
            | Error::InvalidPolicy(_)
            | Error::InvalidPipeline(_)
            | Error::ContextConflict { .. }
            | Error::Io { .. } => ErrorClass::Internal,
        }
    }
}

fn status_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

fn command_failed_message(program: &str, code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("'{}' failed (exit code {})", program, status_display(code))
    } else {
        format!(
            "'{}' failed (exit code {}):\n{}",
            program,
            status_display(code),
            stderr
        )
    }
}
