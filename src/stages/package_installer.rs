//! `acquire_package_installer`: bootstrap the interpreter's package
//! installer, trying the canonical script first and a pinned one second.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::BootstrapSources;
use crate::download;
use crate::error::Result;
use crate::facts::EnvironmentFacts;
use crate::fallback::FallbackChain;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::context::keys;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::process::Cmd;
use crate::retry::RetryPolicy;
use crate::verdict::{Failure, Verdict};

pub const NAME: &str = "acquire_package_installer";

const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(900);

pub struct AcquirePackageInstaller {
    host: Arc<dyn Host>,
    sources: BootstrapSources,
    scratch_dir: PathBuf,
    latest: RetryPolicy,
    pinned: RetryPolicy,
}

impl AcquirePackageInstaller {
    pub fn new(
        host: Arc<dyn Host>,
        sources: BootstrapSources,
        scratch_dir: PathBuf,
        latest: RetryPolicy,
        pinned: RetryPolicy,
    ) -> Self {
        Self {
            host,
            sources,
            scratch_dir,
            latest,
            pinned,
        }
    }

    /// Fetch, optionally verify, and run one bootstrap script.
    fn bootstrap(
        &self,
        interpreter: &Path,
        id: &str,
        url: &str,
        sha256: Option<&str>,
    ) -> Result<()> {
        let script = self.scratch_dir.join(format!("bootstrap-{}.py", id));
        download::fetch(self.host.as_ref(), url, &script)?;
        if let Some(expected) = sha256 {
            download::verify_sha256(&script, expected)?;
        }
        self.host.run(
            &Cmd::path(interpreter)
                .arg_path(&script)
                .timeout(BOOTSTRAP_TIMEOUT)
                .error_msg(format!("{} bootstrap", id)),
        )?;
        Ok(())
    }
}

impl Stage for AcquirePackageInstaller {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::ACQUIRE_PACKAGE_INSTALLER
    }

    fn purpose(&self) -> &str {
        "bootstrap the package installer (latest, then pinned)"
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, ctx: &mut RunContext) -> bool {
        let probe = Cmd::path(&facts.interpreter)
            .args(["-m", "pip", "--version"])
            .allow_fail();
        let present = self
            .host
            .run(&probe)
            .map(|result| result.success())
            .unwrap_or(false);
        present && ctx.record(keys::PACKAGE_INSTALLER, "preinstalled").is_ok()
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let interpreter = facts.interpreter.as_path();
        let sources = &self.sources;

        let chain = FallbackChain::new(NAME, "package installer", self.host.sleeper())
            .link("latest", self.latest.clone(), |_| {
                self.bootstrap(interpreter, "latest", &sources.latest_url, None)
                    .map(|()| "latest")
            })
            .link("pinned", self.pinned.clone(), |_| {
                self.bootstrap(
                    interpreter,
                    "pinned",
                    &sources.pinned_url,
                    sources.pinned_sha256.as_deref(),
                )
                .map(|()| "pinned")
            });

        let result = chain.run(log).and_then(|id| {
            log.info(NAME, format!("package installer provided by {}", id));
            ctx.record(keys::PACKAGE_INSTALLER, id)
                .map_err(|e| Failure::new("cannot record package installer", e))
        });
        result.into()
    }
}
