//! Calling the external installer.
//!
//! The installer is opaque: no stdin, its output is only kept for the log
//! tail, and its exit status is the only success signal. It is never retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DEFAULT_INSTALLER_TIMEOUT;
use crate::error::Error;
use crate::host::Host;
use crate::log::RunLog;
use crate::process::{Cmd, CommandResult};
use crate::verdict::Verdict;

pub const TAG: &str = "invoke_installer";

/// Lines of installer output copied into the run log.
const TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct Invocation {
    path: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            timeout: DEFAULT_INSTALLER_TIMEOUT,
            dir: None,
            envs: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> Cmd {
        let mut cmd = Cmd::path(&self.path)
            .args(&self.args)
            .timeout(self.timeout)
            .allow_fail();
        if let Some(dir) = &self.dir {
            cmd = cmd.dir(dir);
        }
        for (key, value) in &self.envs {
            cmd = cmd.env(key, value);
        }
        cmd
    }

    /// Run the installer once and judge it by its exit status.
    pub fn invoke(&self, host: &dyn Host, log: &mut RunLog) -> Verdict {
        if !self.path.is_file() {
            return Verdict::fail(
                "installer missing",
                Error::EnvironmentUnresolvable(format!(
                    "installer {} does not exist",
                    self.path.display()
                )),
            );
        }

        log.info(TAG, format!("running {}", self.command().display()));

        let result = match host.run(&self.command()) {
            Ok(result) => result,
            Err(Error::Spawn { source, .. }) => {
                return Verdict::fail(
                    "installer could not be started",
                    Error::InstallerNotStarted {
                        path: self.path.clone(),
                        source,
                    },
                )
            }
            Err(Error::Timeout { timeout, .. }) => {
                return Verdict::fail(
                    "installer timed out",
                    Error::InstallerTimedOut {
                        path: self.path.clone(),
                        timeout,
                    },
                )
            }
            Err(other) => return Verdict::fail("installer could not be run", other),
        };

        log_tail(log, &result);

        if result.success() {
            log.info(TAG, format!("{} exited 0", self.path.display()));
            Verdict::Success
        } else {
            Verdict::fail(
                "installer failed",
                Error::InstallerFailed {
                    path: self.path.clone(),
                    code: result.code,
                },
            )
        }
    }
}

/// Invoke `path` with `args`, killing it after `timeout`.
pub fn invoke(
    host: &dyn Host,
    path: &Path,
    args: &[String],
    timeout: Duration,
    log: &mut RunLog,
) -> Verdict {
    Invocation::new(path)
        .args(args.iter().cloned())
        .timeout(timeout)
        .invoke(host, log)
}

fn log_tail(log: &mut RunLog, result: &CommandResult) {
    for (stream, text) in [("stdout", result.stdout_trimmed()), ("stderr", result.stderr_trimmed())] {
        if text.is_empty() {
            continue;
        }
        let lines: Vec<&str> = text.lines().collect();
        let tail = &lines[lines.len().saturating_sub(TAIL_LINES)..];
        log.info(
            TAG,
            format!("installer {} (last {} lines):\n{}", stream, tail.len(), tail.join("\n")),
        );
    }
}
