//! hostprep library.
//!
//! Bootstraps a freshly provisioned host: resolves environment facts, then
//! runs a fixed pipeline of idempotent, retryable stages ending in an
//! external installer. Each failing stage maps to its own exit code.

pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod facts;
pub mod fallback;
pub mod host;
pub mod installer;
pub mod log;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod resolve;
pub mod retry;
pub mod stages;
pub mod telemetry;
pub mod timing;
pub mod verdict;

pub use error::{Error, ErrorClass, Result};
pub use facts::{EnvironmentFacts, PackageManager};
pub use host::{Host, SystemHost};
pub use log::{LogRecord, RunLog, Severity};
pub use pipeline::{Pipeline, PipelineOutcome, RunContext, Stage};
pub use verdict::{Failure, Verdict};
