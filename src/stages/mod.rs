//! The default bootstrap stages.
//!
//! | code | stage |
//! |------|-------|
//! | 11 | `detect_prereqs` |
//! | 12 | `check_connectivity` |
//! | 13 | `install_packages` |
//! | 14 | `acquire_package_installer` |
//! | 15 | `checkout_source` |
//! | 16 | `export_environment` |
//! | 17 | `invoke_installer` |
//!
//! Code 10 belongs to environment resolution, which runs before any stage.

pub mod checkout;
pub mod connectivity;
pub mod export;
pub mod invoke;
pub mod package_installer;
pub mod packages;
pub mod prereqs;

use std::sync::Arc;

use crate::config::{Config, Settings};
use crate::error::Result;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::{self, exit_codes, Pipeline, PipelineOutcome, Stage};
use crate::resolve;
use crate::verdict::Failure;

pub use checkout::CheckoutSource;
pub use connectivity::CheckConnectivity;
pub use export::ExportEnvironment;
pub use invoke::InvokeInstaller;
pub use package_installer::AcquirePackageInstaller;
pub use packages::InstallPackages;
pub use prereqs::DetectPrereqs;

/// The stages in run order.
pub fn default_stages(host: Arc<dyn Host>, config: &Config) -> Vec<Box<dyn Stage>> {
    let policies = &config.policies;
    vec![
        Box::new(DetectPrereqs::new(host.clone())),
        Box::new(CheckConnectivity::new(host.clone(), policies.dns.clone())),
        Box::new(InstallPackages::new(
            host.clone(),
            config.packages.clone(),
            policies.packages.clone(),
        )),
        Box::new(AcquirePackageInstaller::new(
            host.clone(),
            config.bootstrap.clone(),
            config.scratch_dir.clone(),
            policies.installer_latest.clone(),
            policies.installer_pinned.clone(),
        )),
        Box::new(CheckoutSource::new(host.clone(), policies.checkout.clone())),
        Box::new(ExportEnvironment),
        Box::new(InvokeInstaller::new(host, config.installer.clone())),
    ]
}

pub fn default_pipeline(host: Arc<dyn Host>, config: &Config) -> Result<Pipeline> {
    Pipeline::new(default_stages(host, config))
}

/// Resolve the environment, then run the default pipeline.
///
/// A resolution failure ends the run with its own exit code before any stage
/// starts.
pub fn bootstrap(
    settings: &Settings,
    host: Arc<dyn Host>,
    config: &Config,
    log: &mut RunLog,
) -> PipelineOutcome {
    let facts = match resolve::resolve(settings, host.as_ref(), log) {
        Ok(facts) => facts,
        Err(e) => {
            log.error(
                pipeline::TAG,
                format!(
                    "halted at {} with exit code {} ({})",
                    resolve::TAG,
                    exit_codes::RESOLVE_ENVIRONMENT,
                    e.class()
                ),
            );
            return PipelineOutcome::aborted(
                exit_codes::RESOLVE_ENVIRONMENT,
                Failure::new("environment could not be resolved", e),
            );
        }
    };

    match default_pipeline(host, config) {
        Ok(pipeline) => pipeline.execute(&facts, log),
        Err(e) => {
            log.error(pipeline::TAG, e.to_string());
            PipelineOutcome::aborted(exit_codes::INTERNAL, Failure::new("invalid pipeline", e))
        }
    }
}
