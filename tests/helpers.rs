//! Shared test utilities for hostprep tests.
//!
//! [`ScriptedHost`] stands in for the machine: environment, PATH and DNS are
//! fixed up front, and commands answer with scripted replies matched by
//! substring of their command line. Unmatched commands exit 0.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use hostprep::config::{Config, Settings};
use hostprep::error::{Error, Result};
use hostprep::facts::{EnvironmentFacts, PackageManager};
use hostprep::host::{Host, Sleeper};
use hostprep::process::{Cmd, CommandResult};
use hostprep::resolve::deployment::DeploymentProperties;
use hostprep::resolve::source::SourceRepo;
use hostprep::retry::{RetryPolicies, RetryPolicy};

/// How a scripted command answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit 0 with this stdout.
    Ok(String),
    /// Exit with this code and stderr.
    Exit(i32, String),
    /// The program could not be started.
    NotFound,
    TimedOut,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Ok(String::new())
    }

    pub fn stdout(out: &str) -> Self {
        Reply::Ok(out.to_string())
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Reply::Exit(code, stderr.to_string())
    }
}

type Effect = Box<dyn Fn(&Cmd)>;

struct Script {
    pattern: String,
    /// Consumed front to back; the last reply sticks.
    replies: VecDeque<Reply>,
    /// Runs on every matching command, before its reply is returned.
    effect: Option<Effect>,
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub struct ScriptedHost {
    env: HashMap<String, String>,
    programs: HashMap<String, PathBuf>,
    scripts: RefCell<Vec<Script>>,
    dns: RefCell<VecDeque<bool>>,
    pub commands: RefCell<Vec<String>>,
    pub lookups: RefCell<Vec<String>>,
    pub sleeper: RecordingSleeper,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Put `name` on PATH as `/usr/bin/<name>`.
    pub fn with_program(mut self, name: &str) -> Self {
        self.programs
            .insert(name.to_string(), PathBuf::from("/usr/bin").join(name));
        self
    }

    pub fn on(self, pattern: &str, replies: Vec<Reply>) -> Self {
        self.scripts.borrow_mut().push(Script {
            pattern: pattern.to_string(),
            replies: replies.into(),
            effect: None,
        });
        self
    }

    pub fn on_with_effect(
        self,
        pattern: &str,
        replies: Vec<Reply>,
        effect: impl Fn(&Cmd) + 'static,
    ) -> Self {
        self.scripts.borrow_mut().push(Script {
            pattern: pattern.to_string(),
            replies: replies.into(),
            effect: Some(Box::new(effect)),
        });
        self
    }

    /// Successive DNS outcomes; the last one sticks. Default: resolves.
    pub fn with_dns(self, outcomes: Vec<bool>) -> Self {
        *self.dns.borrow_mut() = outcomes.into();
        self
    }

    pub fn ran(&self, pattern: &str) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeper.sleeps.borrow().clone()
    }

    fn next_reply(&self, line: &str) -> Reply {
        let mut scripts = self.scripts.borrow_mut();
        let Some(script) = scripts.iter_mut().find(|s| line.contains(&s.pattern)) else {
            return Reply::ok();
        };
        let reply = if script.replies.len() > 1 {
            script.replies.pop_front()
        } else {
            script.replies.front().cloned()
        };
        reply.unwrap_or_else(Reply::ok)
    }

    fn apply_effect(&self, line: &str, cmd: &Cmd) {
        let scripts = self.scripts.borrow();
        if let Some(effect) = scripts
            .iter()
            .find(|s| line.contains(&s.pattern))
            .and_then(|s| s.effect.as_ref())
        {
            effect(cmd);
        }
    }
}

impl Host for ScriptedHost {
    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }

    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        let line = cmd.display();
        self.commands.borrow_mut().push(line.clone());

        let reply = self.next_reply(&line);
        self.apply_effect(&line, cmd);
        match reply {
            Reply::Ok(stdout) => cmd.check(CommandResult::new(Some(0), stdout, "")),
            Reply::Exit(code, stderr) => cmd.check(CommandResult::new(Some(code), "", stderr)),
            Reply::NotFound => Err(Error::Spawn {
                program: cmd.program().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
            Reply::TimedOut => Err(Error::Timeout {
                program: cmd.program().to_string(),
                timeout: cmd.get_timeout().unwrap_or_default(),
            }),
        }
    }

    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        self.lookups.borrow_mut().push(host.to_string());
        let mut dns = self.dns.borrow_mut();
        let resolves = if dns.len() > 1 {
            dns.pop_front().unwrap_or(true)
        } else {
            dns.front().copied().unwrap_or(true)
        };
        if resolves {
            Ok(vec![SocketAddr::from(([127, 0, 0, 1], port))])
        } else {
            Err(Error::Dns {
                host: host.to_string(),
                reason: "temporary failure in name resolution".to_string(),
            })
        }
    }

    fn sleeper(&self) -> &dyn Sleeper {
        &self.sleeper
    }
}

/// Effect for a scripted `git clone`: populate the target with `.git` and an
/// executable `install.sh`. Runs for failed clones too, like a real partial
/// checkout would.
pub fn fake_clone(cmd: &Cmd) {
    let target = PathBuf::from(cmd.get_args().last().expect("clone target"));
    fs::create_dir_all(target.join(".git")).expect("Failed to create .git");
    write_executable(&target.join("install.sh"), "#!/bin/sh\nexit 0\n");
}

pub fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).expect("Failed to write executable");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod");
}

/// Policies with zero delays so tests never wait.
pub fn fast_policies(checkout_attempts: u32) -> RetryPolicies {
    let zero = Duration::ZERO;
    RetryPolicies {
        dns: RetryPolicy::new(3, zero).unwrap(),
        packages: RetryPolicy::new(2, zero).unwrap(),
        installer_latest: RetryPolicy::once(),
        installer_pinned: RetryPolicy::once(),
        checkout: RetryPolicy::new(checkout_attempts, zero).unwrap(),
    }
}

/// Test environment: a run directory holding one deployment home.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub run_dir: PathBuf,
    pub deployment_home: PathBuf,
    pub scratch_dir: PathBuf,
    pub log_file: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let run_dir = base.join("run");
        let deployment_home = run_dir.join("Deployment12345");
        let scratch_dir = base.join("scratch");
        let log_file = base.join("log").join("hostprep.log");

        fs::create_dir_all(&deployment_home).expect("Failed to create deployment home");

        Self {
            _temp_dir: temp_dir,
            run_dir,
            deployment_home,
            scratch_dir,
            log_file,
        }
    }

    pub fn checkout_dir(&self) -> PathBuf {
        self.deployment_home.join("source")
    }

    pub fn write_properties(&self, content: &str) {
        fs::write(self.deployment_home.join("deployment.properties"), content)
            .expect("Failed to write deployment.properties");
    }

    /// Settings pointing the resolver at this environment's run directory.
    pub fn settings(&self) -> Settings {
        Settings {
            run_dir: Some(self.run_dir.clone()),
            ..Settings::default()
        }
    }

    pub fn config(&self, host: &dyn Host, checkout_attempts: u32) -> Config {
        let mut config = Config::load(host);
        config.scratch_dir = self.scratch_dir.clone();
        config.log_file = self.log_file.clone();
        config.policies = fast_policies(checkout_attempts);
        config.bootstrap.latest_url = "https://bootstrap.example/latest/get-pip.py".to_string();
        config.bootstrap.pinned_url = "https://mirror.example/pinned/get-pip.py".to_string();
        config
    }

    pub fn facts(&self, package_manager: PackageManager, branch: &str) -> EnvironmentFacts {
        EnvironmentFacts {
            package_manager,
            interpreter: PathBuf::from("/usr/bin/python3"),
            deployment_home: self.deployment_home.clone(),
            checkout_dir: self.checkout_dir(),
            branch: branch.to_string(),
            source: SourceRepo::new("https://git.example.com/org/installer.git"),
            properties: DeploymentProperties::default(),
        }
    }
}

/// Share a scripted host with stages while keeping a handle for assertions.
pub fn shared(host: ScriptedHost) -> (Arc<ScriptedHost>, Arc<dyn Host>) {
    let host = Arc::new(host);
    let dyn_host: Arc<dyn Host> = host.clone();
    (host, dyn_host)
}
