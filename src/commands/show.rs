//! Show command - displays information.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, Settings};
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::exit_codes;
use crate::resolve;
use crate::stages;

/// Show target for the show command.
pub enum ShowTarget {
    /// Resolved environment facts
    Facts { json: bool },
    /// Stages and their exit codes
    Stages,
    /// Configuration
    Config,
}

/// Execute the show command.
pub fn cmd_show(
    target: ShowTarget,
    settings: &Settings,
    host: Arc<dyn Host>,
    config: &Config,
) -> Result<()> {
    match target {
        ShowTarget::Facts { json } => {
            let mut log = RunLog::new();
            let facts = resolve::resolve(settings, host.as_ref(), &mut log)
                .context("Environment could not be resolved")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&facts)?);
            } else {
                facts.print();
            }
        }
        ShowTarget::Stages => {
            println!("{:>4}  {:<26} {}", "code", "stage", "purpose");
            for (code, name) in [
                (exit_codes::SUCCESS, "-"),
                (exit_codes::INTERNAL, "-"),
                (exit_codes::RESOLVE_ENVIRONMENT, resolve::TAG),
            ] {
                println!(
                    "{:>4}  {:<26} {}",
                    code,
                    name,
                    exit_codes::describe(code).unwrap_or_default()
                );
            }
            for stage in stages::default_stages(host, config) {
                println!(
                    "{:>4}  {:<26} {}",
                    stage.exit_code(),
                    stage.name(),
                    stage.purpose()
                );
            }
        }
        ShowTarget::Config => config.print(),
    }
    Ok(())
}
