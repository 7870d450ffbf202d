//! `check_connectivity`: wait until the source host resolves.
//!
//! Freshly booted machines often come up before their resolver does, so
//! this stage has the longest retry budget of the pipeline.

use std::sync::Arc;

use super::checkout;
use crate::facts::EnvironmentFacts;
use crate::host::Host;
use crate::log::RunLog;
use crate::pipeline::{exit_codes, RunContext, Stage};
use crate::retry::{RetryPolicy, RetryableAction};
use crate::verdict::Verdict;

pub const NAME: &str = "check_connectivity";

pub struct CheckConnectivity {
    host: Arc<dyn Host>,
    policy: RetryPolicy,
}

impl CheckConnectivity {
    pub fn new(host: Arc<dyn Host>, policy: RetryPolicy) -> Self {
        Self { host, policy }
    }
}

impl Stage for CheckConnectivity {
    fn name(&self) -> &str {
        NAME
    }

    fn exit_code(&self) -> u8 {
        exit_codes::CHECK_CONNECTIVITY
    }

    fn purpose(&self) -> &str {
        "DNS resolution of the source host"
    }

    /// Nothing to reach for a local source or an existing checkout.
    fn is_satisfied(&self, facts: &EnvironmentFacts, _ctx: &mut RunContext) -> bool {
        facts.source.endpoint().is_none() || checkout::is_checked_out(&facts.checkout_dir)
    }

    fn run(&self, facts: &EnvironmentFacts, _ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        let Some((host_name, port)) = facts.source.endpoint() else {
            log.info(NAME, "source is local, no lookup needed");
            return Verdict::Success;
        };

        let host = self.host.as_ref();
        let action = RetryableAction::new(NAME, self.policy.clone(), host.sleeper())
            .label(format!("lookup of {}", host_name));

        match action.run(log, |_| host.lookup_host(&host_name, port)) {
            Ok(addrs) => {
                if let Some(addr) = addrs.first() {
                    log.info(NAME, format!("{} resolves to {}", host_name, addr.ip()));
                }
                Verdict::Success
            }
            Err(failure) => Verdict::Failure(failure),
        }
    }
}
