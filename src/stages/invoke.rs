//! `invoke_installer`: run the installer from the checkout and leave a
//! marker recording which branch was installed.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::InstallerOptions;
use crate::error::Error;
use crate::facts::EnvironmentFacts;
use crate::host::Host;
use crate::installer::Invocation;
use crate::log::RunLog;
use crate::pipeline::context::keys;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::verdict::Verdict;

pub const NAME: &str = "invoke_installer";

/// Marker in the deployment home. Holds the installed branch.
pub const MARKER_FILE: &str = ".hostprep-installed";

pub struct InvokeInstaller {
    host: Arc<dyn Host>,
    options: InstallerOptions,
}

impl InvokeInstaller {
    pub fn new(host: Arc<dyn Host>, options: InstallerOptions) -> Self {
        Self { host, options }
    }

    pub fn installer_path(&self, facts: &EnvironmentFacts) -> PathBuf {
        self.options
            .path
            .clone()
            .unwrap_or_else(|| facts.checkout_dir.join(&self.options.script))
    }
}

pub fn marker_path(facts: &EnvironmentFacts) -> PathBuf {
    facts.deployment_home.join(MARKER_FILE)
}

impl Stage for InvokeInstaller {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::INVOKE_INSTALLER
    }

    fn purpose(&self) -> &str {
        "run the installer and write the install marker"
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, _ctx: &mut RunContext) -> bool {
        if self.options.reinstall {
            return false;
        }
        fs::read_to_string(marker_path(facts))
            .map(|installed| installed.trim() == facts.branch)
            .unwrap_or(false)
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let path = self.installer_path(facts);

        let mut invocation = Invocation::new(&path)
            .args(self.options.args.iter().cloned())
            .timeout(self.options.timeout)
            .dir(&facts.checkout_dir)
            .env("DEPLOYMENT_HOME", facts.deployment_home.display().to_string())
            .env("SOURCE_DIR", facts.checkout_dir.display().to_string())
            .env("SOURCE_BRANCH", facts.branch.as_str());
        if let Some(env_file) = ctx.get(keys::ENV_FILE) {
            invocation = invocation.env("HOSTPREP_ENV_FILE", env_file);
        }

        let verdict = invocation.invoke(self.host.as_ref(), log);
        if !verdict.is_success() {
            return verdict;
        }

        let marker = marker_path(facts);
        if let Err(e) = fs::write(&marker, format!("{}\n", facts.branch)) {
            return Verdict::fail(
                "installer succeeded but the marker could not be written",
                Error::io(format!("failed to write {}", marker.display()), e),
            );
        }
        log.info(NAME, format!("marked {} as installed", facts.branch));

        match ctx.record(keys::INSTALLER, path.display().to_string()) {
            Ok(()) => Verdict::Success,
            Err(e) => Verdict::fail("cannot record installer", e),
        }
    }
}
