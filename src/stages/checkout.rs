//! `checkout_source`: clone the resolved branch into the checkout dir.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::facts::EnvironmentFacts;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::context::keys;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::process::Cmd;
use crate::retry::{RetryPolicy, RetryableAction};
use crate::verdict::{Failure, Verdict};

pub const NAME: &str = "checkout_source";

const CLONE_TIMEOUT: Duration = Duration::from_secs(1800);

pub struct CheckoutSource {
    host: Arc<dyn Host>,
    policy: RetryPolicy,
}

impl CheckoutSource {
    pub fn new(host: Arc<dyn Host>, policy: RetryPolicy) -> Self {
        Self { host, policy }
    }

    /// One clone attempt.
    ///
    /// git writes into a sibling staging dir that is renamed over the
    /// checkout dir only after a clean exit, so an interrupted clone never
    /// leaves a `.git` at the real target. Leftovers from an earlier attempt
    /// are removed first; `git clone` refuses non-empty directories.
    fn clone_once(&self, facts: &EnvironmentFacts, git: &Path) -> Result<()> {
        let target = &facts.checkout_dir;
        let staging = staging_dir(target);
        remove_tree(&staging)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("failed to create {}", parent.display()), e))?;
        }

        self.host.run(
            &Cmd::path(git)
                .args(["clone", "-b", facts.branch.as_str()])
                .arg(facts.source.clone_url())
                .arg_path(&staging)
                .timeout(CLONE_TIMEOUT)
                .error_msg("git clone"),
        )?;

        remove_tree(target)?;
        fs::rename(&staging, target).map_err(|e| {
            Error::io(
                format!("failed to move {} to {}", staging.display(), target.display()),
                e,
            )
        })
    }
}

/// True once a clone has completed into `checkout_dir`.
pub fn is_checked_out(checkout_dir: &Path) -> bool {
    checkout_dir.join(".git").is_dir()
}

/// `<checkout dir>.partial`, next to the checkout dir.
pub fn staging_dir(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("checkout"));
    name.push(".partial");
    target.with_file_name(name)
}

fn remove_tree(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .map_err(|e| Error::io(format!("failed to remove {}", path.display()), e))?;
    }
    Ok(())
}

fn record_source_dir(facts: &EnvironmentFacts, ctx: &mut RunContext) -> Result<()> {
    ctx.record(keys::SOURCE_DIR, facts.checkout_dir.display().to_string())
}

impl Stage for CheckoutSource {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::CHECKOUT_SOURCE
    }

    fn purpose(&self) -> &str {
        "git clone the branch into the checkout dir"
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, ctx: &mut RunContext) -> bool {
        is_checked_out(&facts.checkout_dir) && record_source_dir(facts, ctx).is_ok()
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let Some(git) = self.host.find_program("git") else {
            return Verdict::fail(
                "git missing",
                Error::EnvironmentUnresolvable("git not found in PATH".to_string()),
            );
        };

        log.info(
            NAME,
            format!(
                "cloning {} (branch {}) into {}",
                facts.source,
                facts.branch,
                facts.checkout_dir.display()
            ),
        );

        let action = RetryableAction::new(NAME, self.policy.clone(), self.host.sleeper())
            .label(format!("clone of {}", facts.branch));
        action
            .run(log, |_| self.clone_once(facts, &git))
            .and_then(|()| {
                record_source_dir(facts, ctx)
                    .map_err(|e| Failure::new("cannot record source dir", e))
            })
            .into()
    }
}
