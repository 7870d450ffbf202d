//! Resolved facts about the host.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::process::Cmd;
use crate::resolve::deployment::DeploymentProperties;
use crate::resolve::source::SourceRepo;

/// System package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Dnf,
    Yum,
    Apt,
    Unknown,
}

impl PackageManager {
    /// Probe order, most modern first.
    pub const PROBE_ORDER: [PackageManager; 3] =
        [PackageManager::Dnf, PackageManager::Yum, PackageManager::Apt];

    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt",
            PackageManager::Unknown => "unknown",
        }
    }

    /// Executable that identifies this manager on PATH.
    pub fn program(&self) -> Option<&'static str> {
        match self {
            PackageManager::Dnf => Some("dnf"),
            PackageManager::Yum => Some("yum"),
            PackageManager::Apt => Some("apt-get"),
            PackageManager::Unknown => None,
        }
    }

    /// Command that refreshes package metadata before installing, if needed.
    pub fn refresh_command(&self) -> Option<Cmd> {
        match self {
            PackageManager::Apt => Some(
                Cmd::new("apt-get")
                    .args(["-y", "update"])
                    .env("DEBIAN_FRONTEND", "noninteractive"),
            ),
            _ => None,
        }
    }

    pub fn install_command(&self, packages: &[String]) -> Option<Cmd> {
        let cmd = match self {
            PackageManager::Dnf => Cmd::new("dnf").args(["-y", "install"]),
            PackageManager::Yum => Cmd::new("yum").args(["-y", "install"]),
            PackageManager::Apt => Cmd::new("apt-get")
                .args(["-y", "install"])
                .env("DEBIAN_FRONTEND", "noninteractive"),
            PackageManager::Unknown => return None,
        };
        Some(cmd.args(packages))
    }

    /// Command that exits 0 iff `package` is installed.
    pub fn query_command(&self, package: &str) -> Option<Cmd> {
        match self {
            PackageManager::Dnf | PackageManager::Yum => {
                Some(Cmd::new("rpm").args(["-q", package]).allow_fail())
            }
            PackageManager::Apt => Some(Cmd::new("dpkg").args(["-s", package]).allow_fail()),
            PackageManager::Unknown => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dnf" => Ok(PackageManager::Dnf),
            "yum" => Ok(PackageManager::Yum),
            "apt" | "apt-get" => Ok(PackageManager::Apt),
            other => Err(format!("unsupported package manager '{}'", other)),
        }
    }
}

/// Snapshot of the host, computed once per run and only ever read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentFacts {
    pub package_manager: PackageManager,
    /// Interpreter executable.
    pub interpreter: PathBuf,
    pub deployment_home: PathBuf,
    /// Where the source tree is checked out.
    pub checkout_dir: PathBuf,
    pub branch: String,
    pub source: SourceRepo,
    #[serde(skip)]
    pub properties: DeploymentProperties,
}

impl EnvironmentFacts {
    /// Print facts for humans.
    pub fn print(&self) {
        println!("Environment:");
        println!("  Package manager:  {}", self.package_manager);
        println!("  Interpreter:      {}", self.interpreter.display());
        println!("  Deployment home:  {}", self.deployment_home.display());
        println!("  Checkout dir:     {}", self.checkout_dir.display());
        println!("  Branch:           {}", self.branch);
        println!("  Source:           {}", self.source);
        println!("  Properties:       {} loaded", self.properties.len());
    }
}
