//! `install_packages`: system packages through the detected manager.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::facts::{EnvironmentFacts, PackageManager};
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::retry::{RetryPolicy, RetryableAction};
use crate::verdict::Verdict;

pub const NAME: &str = "install_packages";

/// Per-attempt ceiling for one install transaction.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(1800);

pub struct InstallPackages {
    host: Arc<dyn Host>,
    packages: Vec<String>,
    policy: RetryPolicy,
}

impl InstallPackages {
    pub fn new(host: Arc<dyn Host>, packages: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            host,
            packages,
            policy,
        }
    }

    /// Packages the manager does not report as installed.
    fn missing(&self, manager: PackageManager) -> Vec<String> {
        self.packages
            .iter()
            .filter(|package| match manager.query_command(package) {
                Some(query) => !self
                    .host
                    .run(&query)
                    .map(|result| result.success())
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect()
    }

    fn install(&self, manager: PackageManager, packages: &[String]) -> Result<()> {
        if let Some(refresh) = manager.refresh_command() {
            self.host.run(&refresh.timeout(INSTALL_TIMEOUT))?;
        }
        if let Some(install) = manager.install_command(packages) {
            self.host.run(
                &install
                    .timeout(INSTALL_TIMEOUT)
                    .error_msg(format!("{} install", manager)),
            )?;
        }
        Ok(())
    }
}

impl Stage for InstallPackages {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::INSTALL_PACKAGES
    }

    fn purpose(&self) -> &str {
        "install system packages via the detected manager"
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, _ctx: &mut RunContext) -> bool {
        if facts.package_manager == PackageManager::Unknown {
            return false;
        }
        self.packages.is_empty() || self.missing(facts.package_manager).is_empty()
    }

    fn run(&self, facts: &EnvironmentFacts, _ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let manager = facts.package_manager;
        if manager == PackageManager::Unknown {
            log.warn(
                NAME,
                format!(
                    "package manager unknown, skipping install of: {}",
                    self.packages.join(" ")
                ),
            );
            return Verdict::Success;
        }

        let missing = self.missing(manager);
        if missing.is_empty() {
            log.info(NAME, "all packages already installed");
            return Verdict::Success;
        }
        log.info(
            NAME,
            format!("installing with {}: {}", manager, missing.join(" ")),
        );

        let action = RetryableAction::new(NAME, self.policy.clone(), self.host.sleeper())
            .label(format!("{} install", manager));
        action.run(log, |_| self.install(manager, &missing)).into()
    }
}
