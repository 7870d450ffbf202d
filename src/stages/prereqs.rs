//! `detect_prereqs`: the interpreter must exist and start.

use std::sync::Arc;

use crate::error::Error;
use crate::facts::EnvironmentFacts;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::context::keys;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::process::Cmd;
use crate::verdict::Verdict;

pub const NAME: &str = "detect_prereqs";

pub struct DetectPrereqs {
    host: Arc<dyn Host>,
}

impl DetectPrereqs {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }
}

impl Stage for DetectPrereqs {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::DETECT_PREREQS
    }

    fn purpose(&self) -> &str {
        "interpreter present and runnable"
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let interpreter = &facts.interpreter;
        let probe = Cmd::path(interpreter).arg("--version").allow_fail();

        let result = match self.host.run(&probe) {
            Ok(result) => result,
            Err(e) => {
                return Verdict::fail(
                    "interpreter not runnable",
                    Error::EnvironmentUnresolvable(format!(
                        "{} could not be run: {}",
                        interpreter.display(),
                        e
                    )),
                )
            }
        };

        // Older interpreters print their version on stderr.
        let version = [result.stdout_trimmed(), result.stderr_trimmed()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string);

        match version {
            Some(version) if result.success() => {
                log.info(NAME, format!("{} is {}", interpreter.display(), version));
                if let Err(e) = ctx.record(keys::INTERPRETER_VERSION, version) {
                    return Verdict::fail("cannot record interpreter version", e);
                }
            }
            _ => log.warn(
                NAME,
                format!(
                    "could not determine the version of {} (exit code {}), continuing",
                    interpreter.display(),
                    result.code()
                ),
            ),
        }

        Verdict::Success
    }
}
