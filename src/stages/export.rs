//! `export_environment`: write the resolved facts as a sourceable shell file
//! so the installer and later logins see the same values.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::facts::EnvironmentFacts;
use crate::log::RunLog;
use crate::pipeline::context::keys;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::verdict::Verdict;

pub const NAME: &str = "export_environment";

pub const ENV_FILE: &str = "hostprep.env";

pub struct ExportEnvironment;

/// `<deployment home>/hostprep.env`
pub fn env_file(facts: &EnvironmentFacts) -> PathBuf {
    facts.deployment_home.join(ENV_FILE)
}

/// File contents. Depends only on the facts, so reruns produce identical bytes.
pub fn render(facts: &EnvironmentFacts) -> String {
    let vars = [
        ("DEPLOYMENT_HOME", facts.deployment_home.display().to_string()),
        ("SOURCE_DIR", facts.checkout_dir.display().to_string()),
        ("SOURCE_BRANCH", facts.branch.clone()),
        ("SOURCE_GIT_URL", facts.source.url.clone()),
        ("HOSTPREP_PACKAGE_MANAGER", facts.package_manager.to_string()),
        ("HOSTPREP_INTERPRETER", facts.interpreter.display().to_string()),
    ];

    let mut out = String::from("# Written by hostprep.\n");
    for (key, value) in vars {
        out.push_str(&format!("export {}={}\n", key, shell_quote(&value)));
    }
    out
}

/// Single-quote for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("env.tmp");
    fs::write(&tmp, content)
        .map_err(|e| Error::io(format!("failed to write {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .map_err(|e| Error::io(format!("failed to move {} into place", path.display()), e))
}

impl Stage for ExportEnvironment {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::EXPORT_ENVIRONMENT
    }

    fn purpose(&self) -> &str {
        "write hostprep.env into the deployment home"
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, ctx: &mut RunContext) -> bool {
        let path = env_file(facts);
        let current = fs::read_to_string(&path).ok();
        current.as_deref() == Some(render(facts).as_str())
            && ctx
                .record(keys::ENV_FILE, path.display().to_string())
                .is_ok()
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let path = env_file(facts);
        let result = write_atomic(&path, &render(facts))
            .and_then(|()| ctx.record(keys::ENV_FILE, path.display().to_string()));
        match result {
            Ok(()) => {
                log.info(NAME, format!("wrote {}", path.display()));
                Verdict::Success
            }
            Err(e) => Verdict::fail("cannot export environment", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
