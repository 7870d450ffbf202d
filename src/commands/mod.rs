//! CLI command handlers.
//!
//! - `run` - Resolve the environment and run the bootstrap pipeline
//! - `preflight` - Report what a run would do
//! - `show` - Display facts, stages or configuration

mod preflight;
mod run;
pub mod show;

pub use preflight::cmd_preflight;
pub use run::{cmd_run, RunOptions};
pub use show::cmd_show;
