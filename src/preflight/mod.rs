//! Preflight: resolve the environment and ask every stage whether it would
//! run, without changing the host.
//!
//! Run with `hostprep preflight`.

mod types;

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::config::{Config, Settings};
use crate::facts::PackageManager;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::RunContext;
use crate::resolve;
use crate::stages;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Tools the default stages call once packages are installed.
const HOST_TOOLS: [&str; 2] = ["git", "curl"];

pub fn run_preflight(settings: &Settings, host: Arc<dyn Host>, config: &Config) -> PreflightReport {
    let mut checks = Vec::new();
    // Preflight records stay out of the run log file.
    let mut log = RunLog::new();

    let facts = match resolve::resolve(settings, host.as_ref(), &mut log) {
        Ok(facts) => {
            checks.push(CheckResult::pass_with(
                resolve::TAG,
                &format!("deployment home {}", facts.deployment_home.display()),
            ));
            facts
        }
        Err(e) => {
            checks.push(CheckResult::fail(resolve::TAG, &e.to_string()));
            return PreflightReport { checks };
        }
    };

    if facts.package_manager == PackageManager::Unknown {
        checks.push(CheckResult::warn(
            "package manager",
            "none detected, packages will not be installed",
        ));
    } else {
        checks.push(CheckResult::pass_with(
            "package manager",
            facts.package_manager.name(),
        ));
    }

    for tool in HOST_TOOLS {
        match host.find_program(tool) {
            Some(path) => checks.push(CheckResult::pass_with(tool, &path.display().to_string())),
            None if config.packages.iter().any(|p| p == tool) => {
                checks.push(CheckResult::pending(tool, "will be installed"))
            }
            None => checks.push(CheckResult::warn(tool, "not found in PATH")),
        }
    }

    let mut ctx = RunContext::new();
    for stage in stages::default_stages(host, config) {
        if stage.is_satisfied(&facts, &mut ctx) {
            checks.push(CheckResult::pass_with(stage.name(), "already satisfied"));
        } else {
            checks.push(CheckResult::pending(
                stage.name(),
                &format!("will run (exit code {} on failure)", stage.exit_code()),
            ));
        }
    }

    PreflightReport { checks }
}

/// Run preflight and bail if any check fails.
pub fn run_preflight_or_fail(
    settings: &Settings,
    host: Arc<dyn Host>,
    config: &Config,
) -> Result<PreflightReport> {
    let report = run_preflight(settings, host, config);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before running.",
            report.fail_count()
        );
    }
    Ok(report)
}
