//! Preflight command - reports without changing anything.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, Settings};
use crate::host::Host;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(
    settings: &Settings,
    host: Arc<dyn Host>,
    config: &Config,
    strict: bool,
) -> Result<()> {
    println!("Running preflight checks...\n");
    if strict {
        preflight::run_preflight_or_fail(settings, host, config)?;
        println!("All preflight checks passed!");
    } else {
        let report = preflight::run_preflight(settings, host, config);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to exit non-zero.");
        }
    }
    Ok(())
}
