//! Run command - the full bootstrap.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, Settings};
use crate::host::Host;
use crate::log::{FileSink, RunLog};
use crate::pipeline::{self, exit_codes, PipelineOutcome};
use crate::resolve;
use crate::stages;

/// Installer overrides from the command line.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub installer: Option<PathBuf>,
    pub reinstall: bool,
    pub args: Vec<String>,
}

/// Execute the run command. Returns the process exit code.
pub fn cmd_run(
    settings: &Settings,
    host: Arc<dyn Host>,
    mut config: Config,
    options: RunOptions,
) -> Result<u8> {
    if options.installer.is_some() {
        config.installer.path = options.installer;
    }
    config.installer.reinstall = options.reinstall;
    config.installer.args = options.args;

    let sink = FileSink::open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    let mut log = RunLog::new().with_sink(sink);

    println!("Bootstrapping host (log: {})", config.log_file.display());
    let outcome = stages::bootstrap(settings, host, &config, &mut log);

    if outcome.is_success() {
        println!(
            "Bootstrap complete: {} stage(s) ran, {} already satisfied.",
            outcome.ran.len(),
            outcome.skipped.len()
        );
    } else {
        let stage = failure_site(&outcome);
        let reason = outcome
            .failure
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_default();
        eprintln!(
            "Bootstrap failed at {} (exit code {}, {}): {}",
            stage,
            outcome.exit_code,
            exit_codes::describe(outcome.exit_code).unwrap_or("unknown"),
            reason
        );
    }

    Ok(outcome.exit_code)
}

/// Where the run stopped: the failed stage, or the step before any stage ran.
fn failure_site(outcome: &PipelineOutcome) -> &str {
    match (&outcome.failed_stage, outcome.exit_code) {
        (Some(stage), _) => stage.as_str(),
        (None, exit_codes::RESOLVE_ENVIRONMENT) => resolve::TAG,
        (None, _) => pipeline::TAG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::verdict::Failure;

    #[test]
    fn test_failure_site_follows_exit_code() {
        let resolve_failure = PipelineOutcome::aborted(
            exit_codes::RESOLVE_ENVIRONMENT,
            Failure::new(
                "environment could not be resolved",
                Error::EnvironmentUnresolvable("x".into()),
            ),
        );
        assert_eq!(failure_site(&resolve_failure), "resolve_environment");

        let invalid = PipelineOutcome::aborted(
            exit_codes::INTERNAL,
            Failure::new("invalid pipeline", Error::InvalidPipeline("dup".into())),
        );
        assert_eq!(failure_site(&invalid), "pipeline");

        let mut halted = invalid;
        halted.exit_code = exit_codes::CHECKOUT_SOURCE;
        halted.failed_stage = Some("checkout_source".into());
        assert_eq!(failure_site(&halted), "checkout_source");
    }
}
