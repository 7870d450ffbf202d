//! Stage verdicts.

use std::fmt;

use crate::error::Error;

/// Why something failed, with the typed cause underneath.
#[derive(Debug)]
pub struct Failure {
    pub reason: String,
    pub cause: Error,
}

impl Failure {
    pub fn new(reason: impl Into<String>, cause: Error) -> Self {
        Self {
            reason: reason.into(),
            cause,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.cause)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Outcome of a stage or of the installer call.
#[must_use]
#[derive(Debug)]
pub enum Verdict {
    Success,
    Failure(Failure),
}

impl Verdict {
    pub fn fail(reason: impl Into<String>, cause: Error) -> Self {
        Verdict::Failure(Failure::new(reason, cause))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Verdict::Success => None,
            Verdict::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<(), Failure> {
        match self {
            Verdict::Success => Ok(()),
            Verdict::Failure(failure) => Err(failure),
        }
    }
}

impl From<Result<(), Failure>> for Verdict {
    fn from(result: Result<(), Failure>) -> Self {
        match result {
            Ok(()) => Verdict::Success,
            Err(failure) => Verdict::Failure(failure),
        }
    }
}
