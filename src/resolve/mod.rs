//! Environment resolution.
//!
//! Every fact follows the same layering:
//! 1. Explicit setting (CLI flag)
//! 2. Environment variable
//! 3. Probing the host (PATH, run directory, deployment properties)
//! 4. Hard-coded default
//!
//! Package-manager detection never fails: an unrecognised host yields
//! [`PackageManager::Unknown`]. The deployment home is never defaulted: if it
//! cannot be pinned to exactly one directory, resolution fails.

pub mod deployment;
pub mod source;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{Settings, DEFAULT_BRANCH, DEFAULT_INTERPRETER, DEFAULT_RUN_DIR, DEFAULT_SOURCE_URL};
use crate::error::Result;
use crate::facts::{EnvironmentFacts, PackageManager};
use crate::host::Host;
use crate::log::RunLog;

use deployment::DeploymentProperties;
use source::{Credentials, SourceRepo};

pub const TAG: &str = "resolve_environment";

/// Interpreters probed on PATH, in order.
pub const INTERPRETER_CANDIDATES: [&str; 2] = ["python3", "python"];

/// Deployment property patterns; see [`DeploymentProperties::lookup`].
pub const BRANCH_PROPERTY: &str = "source.branch";
pub const SOURCE_URL_PROPERTY: &str = "source.url";

/// How a fact was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Explicit,
    Environment,
    Probed,
    Default,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Explicit => "explicit",
            Origin::Environment => "environment",
            Origin::Probed => "probed",
            Origin::Default => "default",
        })
    }
}

/// A resolved value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Resolved<T> {
    fn new(value: T, origin: Origin) -> Self {
        Self { value, origin }
    }
}

pub struct Resolver<'a> {
    settings: &'a Settings,
    host: &'a dyn Host,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a Settings, host: &'a dyn Host) -> Self {
        Self { settings, host }
    }

    /// Resolve every fact, logging where each one came from.
    pub fn resolve(&self, log: &mut RunLog) -> Result<EnvironmentFacts> {
        let package_manager = self.package_manager(log);
        if package_manager.value == PackageManager::Unknown {
            log.warn(
                TAG,
                "no supported package manager found, system packages will not be installed",
            );
        } else {
            log.info(
                TAG,
                format!(
                    "package manager: {} ({})",
                    package_manager.value, package_manager.origin
                ),
            );
        }

        let interpreter = self.interpreter();
        log.info(
            TAG,
            format!(
                "interpreter: {} ({})",
                interpreter.value.display(),
                interpreter.origin
            ),
        );

        let deployment_home = match self.deployment_home() {
            Ok(home) => home,
            Err(e) => {
                log.error(TAG, e.to_string());
                return Err(e);
            }
        };
        log.info(
            TAG,
            format!(
                "deployment home: {} ({})",
                deployment_home.value.display(),
                deployment_home.origin
            ),
        );

        let properties = match DeploymentProperties::load(&deployment_home.value) {
            Ok(properties) => properties,
            Err(e) => {
                log.error(TAG, e.to_string());
                return Err(e);
            }
        };
        if properties.is_empty() {
            log.info(TAG, "no deployment properties found");
        } else {
            log.info(
                TAG,
                format!("read {} deployment properties", properties.len()),
            );
        }

        let branch = self.branch(&properties);
        log.info(
            TAG,
            format!("branch: {} ({})", branch.value, branch.origin),
        );

        let source = self.source(&properties);
        log.info(
            TAG,
            format!("source: {} ({})", source.value, source.origin),
        );

        let checkout_dir = self.checkout_dir(&deployment_home.value);
        log.info(
            TAG,
            format!(
                "checkout dir: {} ({})",
                checkout_dir.value.display(),
                checkout_dir.origin
            ),
        );

        Ok(EnvironmentFacts {
            package_manager: package_manager.value,
            interpreter: interpreter.value,
            deployment_home: deployment_home.value,
            checkout_dir: checkout_dir.value,
            branch: branch.value,
            source: source.value,
            properties,
        })
    }

    /// Detect the package manager. Never fails.
    pub fn package_manager(&self, log: &mut RunLog) -> Resolved<PackageManager> {
        let layered = [
            (self.settings.package_manager.clone(), Origin::Explicit),
            (self.host.env_var("HOSTPREP_PACKAGE_MANAGER"), Origin::Environment),
        ];
        for (value, origin) in layered {
            if let Some(value) = value {
                match value.parse::<PackageManager>() {
                    Ok(pm) => return Resolved::new(pm, origin),
                    Err(e) => log.warn(TAG, format!("ignoring {} override: {}", origin, e)),
                }
            }
        }

        for pm in PackageManager::PROBE_ORDER {
            if let Some(program) = pm.program() {
                if self.host.find_program(program).is_some() {
                    return Resolved::new(pm, Origin::Probed);
                }
            }
        }

        Resolved::new(PackageManager::Unknown, Origin::Default)
    }

    pub fn interpreter(&self) -> Resolved<PathBuf> {
        if let Some(path) = &self.settings.interpreter {
            return Resolved::new(path.clone(), Origin::Explicit);
        }

        if let Some(value) = self.host.env_var("HOSTPREP_INTERPRETER") {
            // A bare name is looked up on PATH.
            let path = PathBuf::from(&value);
            if path.components().count() == 1 {
                if let Some(found) = self.host.find_program(&value) {
                    return Resolved::new(found, Origin::Environment);
                }
            }
            return Resolved::new(path, Origin::Environment);
        }

        for candidate in INTERPRETER_CANDIDATES {
            if let Some(found) = self.host.find_program(candidate) {
                return Resolved::new(found, Origin::Probed);
            }
        }

        Resolved::new(PathBuf::from(DEFAULT_INTERPRETER), Origin::Default)
    }

    /// Locate the deployment home. Fails rather than guessing.
    pub fn deployment_home(&self) -> Result<Resolved<PathBuf>> {
        if let Some(path) = &self.settings.deployment_home {
            return Ok(Resolved::new(path.clone(), Origin::Explicit));
        }

        if let Some(value) = self.host.env_var("DEPLOYMENT_HOME") {
            return Ok(Resolved::new(PathBuf::from(value), Origin::Environment));
        }

        let run_dir = self
            .settings
            .run_dir
            .clone()
            .or_else(|| self.host.env_var("HOSTPREP_RUN_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_DIR));

        let home = deployment::find_deployment_home(&run_dir)?;
        Ok(Resolved::new(home, Origin::Probed))
    }

    pub fn branch(&self, properties: &DeploymentProperties) -> Resolved<String> {
        if let Some(branch) = &self.settings.branch {
            return Resolved::new(branch.clone(), Origin::Explicit);
        }
        if let Some(branch) = self.host.env_var("SOURCE_BRANCH") {
            return Resolved::new(branch, Origin::Environment);
        }
        if let Some((_, branch)) = properties.lookup(BRANCH_PROPERTY) {
            return Resolved::new(branch.to_string(), Origin::Probed);
        }
        Resolved::new(DEFAULT_BRANCH.to_string(), Origin::Default)
    }

    pub fn source(&self, properties: &DeploymentProperties) -> Resolved<SourceRepo> {
        let (url, origin) = if let Some(url) = &self.settings.source_url {
            (url.clone(), Origin::Explicit)
        } else if let Some(url) = self.host.env_var("SOURCE_GIT_URL") {
            (url, Origin::Environment)
        } else if let Some((_, url)) = properties.lookup(SOURCE_URL_PROPERTY) {
            (url.to_string(), Origin::Probed)
        } else {
            (DEFAULT_SOURCE_URL.to_string(), Origin::Default)
        };

        let mut repo = SourceRepo::new(url);
        if let (Some(username), Some(password)) = (
            self.host.env_var("SOURCE_GIT_USERNAME"),
            self.host.env_var("SOURCE_GIT_PASSWORD"),
        ) {
            repo = repo.with_credentials(Credentials { username, password });
        }
        Resolved::new(repo, origin)
    }

    pub fn checkout_dir(&self, deployment_home: &Path) -> Resolved<PathBuf> {
        if let Some(dir) = &self.settings.source_dir {
            return Resolved::new(dir.clone(), Origin::Explicit);
        }
        if let Some(dir) = self.host.env_var("SOURCE_DIR") {
            return Resolved::new(PathBuf::from(dir), Origin::Environment);
        }
        Resolved::new(deployment_home.join("source"), Origin::Default)
    }
}

/// Resolve facts with the given settings against `host`.
pub fn resolve(settings: &Settings, host: &dyn Host, log: &mut RunLog) -> Result<EnvironmentFacts> {
    Resolver::new(settings, host).resolve(log)
}

