//! hostprep - host bootstrap orchestrator.
//!
//! Detects the package manager, interpreter and deployment home, installs
//! prerequisites, checks out the source tree and runs its installer.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};

use hostprep::commands;
use hostprep::config::{Config, Settings};
use hostprep::host::{Host, SystemHost};
use hostprep::pipeline::exit_codes;
use hostprep::telemetry;

#[derive(Parser)]
#[command(name = "hostprep")]
#[command(about = "Bootstrap a freshly provisioned host")]
#[command(
    after_help = "QUICK START:\n  hostprep preflight     Check what a run would do\n  hostprep run           Bootstrap this host\n  hostprep show stages   List stages and exit codes"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Deployment home (skips the run directory scan)
    #[arg(long, global = true)]
    deployment_home: Option<PathBuf>,

    /// Directory scanned for the deployment home
    #[arg(long, global = true)]
    run_dir: Option<PathBuf>,

    /// Branch to check out
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Git URL of the source repository
    #[arg(long, global = true)]
    source_url: Option<String>,

    /// Checkout target (default: <deployment home>/source)
    #[arg(long, global = true)]
    source_dir: Option<PathBuf>,

    /// Package manager: dnf, yum or apt
    #[arg(long, global = true)]
    package_manager: Option<String>,

    /// Interpreter executable
    #[arg(long, global = true)]
    interpreter: Option<PathBuf>,

    /// Run log file (default: ~/.hostprep/log/hostprep.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// More output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

impl GlobalArgs {
    fn settings(&self) -> Settings {
        Settings {
            package_manager: self.package_manager.clone(),
            interpreter: self.interpreter.clone(),
            deployment_home: self.deployment_home.clone(),
            run_dir: self.run_dir.clone(),
            branch: self.branch.clone(),
            source_url: self.source_url.clone(),
            source_dir: self.source_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the environment and run every stage
    Run {
        /// Installer to run (default: <checkout>/install.sh)
        #[arg(long)]
        installer: Option<PathBuf>,

        /// Run the installer even if this branch was already installed
        #[arg(long)]
        reinstall: bool,

        /// Arguments passed to the installer
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Report what a run would do, without changing anything
    Preflight {
        /// Exit non-zero if any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Resolved environment facts
    Facts {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stages and their exit codes
    Stages,
    /// Current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    telemetry::init_tracing(telemetry::level_for(cli.global.verbose));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::INTERNAL)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let host: Arc<dyn Host> = Arc::new(SystemHost);
    let settings = cli.global.settings();
    let mut config = Config::load(host.as_ref());
    if let Some(log_file) = cli.global.log_file {
        config.log_file = log_file;
    }

    match cli.command {
        Commands::Run {
            installer,
            reinstall,
            args,
        } => {
            let options = commands::RunOptions {
                installer,
                reinstall,
                args,
            };
            commands::cmd_run(&settings, host, config, options)
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&settings, host, &config, strict)?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Facts { json } => commands::show::ShowTarget::Facts { json },
                ShowTarget::Stages => commands::show::ShowTarget::Stages,
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(target, &settings, host, &config)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}
