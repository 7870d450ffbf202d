//! Configuration management for hostprep.
//!
//! Two layers live here:
//! - [`Settings`]: explicit overrides, normally from CLI flags. They win over
//!   everything the resolver would otherwise detect.
//! - [`Config`]: run options read from the environment (a `.env` file in the
//!   working directory is loaded into the process environment first by the
//!   binary; real environment variables take precedence over it).

use std::path::PathBuf;
use std::time::Duration;

use crate::host::Host;
use crate::retry::RetryPolicies;

/// Default source repository.
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/cons3rt/pycons3rt.git";

/// Default branch when nothing overrides it.
pub const DEFAULT_BRANCH: &str = "master";

/// Where the agent keeps one directory per deployment.
pub const DEFAULT_RUN_DIR: &str = "/opt/cons3rt-agent/run";

pub const DEFAULT_INTERPRETER: &str = "/usr/bin/python3";

/// Canonical bootstrap script for the package-installer tool.
pub const DEFAULT_BOOTSTRAP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

/// Pinned bootstrap script used when the canonical one fails.
pub const DEFAULT_PINNED_BOOTSTRAP_URL: &str = "https://bootstrap.pypa.io/pip/3.8/get-pip.py";

pub const DEFAULT_PACKAGES: &[&str] = &["git", "curl"];

pub const DEFAULT_INSTALLER_SCRIPT: &str = "install.sh";

pub const DEFAULT_INSTALLER_TIMEOUT: Duration = Duration::from_secs(3600);

/// Explicit overrides. `None` means "let the resolver decide".
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub package_manager: Option<String>,
    pub interpreter: Option<PathBuf>,
    pub deployment_home: Option<PathBuf>,
    pub run_dir: Option<PathBuf>,
    pub branch: Option<String>,
    pub source_url: Option<String>,
    pub source_dir: Option<PathBuf>,
}

/// Where the package-installer bootstrap script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSources {
    pub latest_url: String,
    pub pinned_url: String,
    /// Expected SHA-256 of the pinned script, lowercase hex.
    pub pinned_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InstallerOptions {
    /// Installer executable. Defaults to `<checkout>/<script>`.
    pub path: Option<PathBuf>,
    pub script: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Run the installer even if the marker says it already ran.
    pub reinstall: bool,
}

/// Options consumed by the default stages.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_file: PathBuf,
    pub packages: Vec<String>,
    pub bootstrap: BootstrapSources,
    pub installer: InstallerOptions,
    /// Scratch space for downloaded bootstrap scripts.
    pub scratch_dir: PathBuf,
    pub policies: RetryPolicies,
}

impl Config {
    /// Read configuration from the host environment, falling back to defaults.
    pub fn load(host: &dyn Host) -> Self {
        let log_file = host
            .env_var("HOSTPREP_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_file);

        let packages = host
            .env_var("HOSTPREP_PACKAGES")
            .map(|list| {
                list.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect());

        let bootstrap = BootstrapSources {
            latest_url: host
                .env_var("HOSTPREP_BOOTSTRAP_URL")
                .unwrap_or_else(|| DEFAULT_BOOTSTRAP_URL.to_string()),
            pinned_url: host
                .env_var("HOSTPREP_PINNED_BOOTSTRAP_URL")
                .unwrap_or_else(|| DEFAULT_PINNED_BOOTSTRAP_URL.to_string()),
            pinned_sha256: host
                .env_var("HOSTPREP_PINNED_BOOTSTRAP_SHA256")
                .map(|s| s.to_lowercase()),
        };

        let installer_timeout = host
            .env_var("HOSTPREP_INSTALLER_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INSTALLER_TIMEOUT);

        let installer = InstallerOptions {
            path: host.env_var("HOSTPREP_INSTALLER").map(PathBuf::from),
            script: host
                .env_var("HOSTPREP_INSTALLER_SCRIPT")
                .unwrap_or_else(|| DEFAULT_INSTALLER_SCRIPT.to_string()),
            args: Vec::new(),
            timeout: installer_timeout,
            reinstall: false,
        };

        let scratch_dir = host
            .env_var("HOSTPREP_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("hostprep"));

        Self {
            log_file,
            packages,
            bootstrap,
            installer,
            scratch_dir,
            policies: RetryPolicies::default(),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  HOSTPREP_LOG_FILE: {}", self.log_file.display());
        println!("  HOSTPREP_PACKAGES: {}", self.packages.join(" "));
        println!("  HOSTPREP_BOOTSTRAP_URL: {}", self.bootstrap.latest_url);
        println!(
            "  HOSTPREP_PINNED_BOOTSTRAP_URL: {}",
            self.bootstrap.pinned_url
        );
        match &self.installer.path {
            Some(path) => println!("  HOSTPREP_INSTALLER: {}", path.display()),
            None => println!(
                "  HOSTPREP_INSTALLER: <checkout>/{}",
                self.installer.script
            ),
        }
        println!("  Installer timeout: {:?}", self.installer.timeout);
    }
}

/// `~/.hostprep/log/hostprep.log`, or under the temp dir without a home.
pub fn default_log_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".hostprep")
        .join("log")
        .join("hostprep.log")
}
