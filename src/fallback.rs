//! Ordered acquisition strategies for a single goal.
//!
//! A link only gives way to the next one after its own retries are spent.
//! Only the last link's exhaustion is an error in the log; earlier ones are
//! recorded at Info since the chain goes on.

use crate::error::{Error, Result};
use crate::host::Sleeper;
use crate::log::{RunLog, Severity};
use crate::retry::{RetryPolicy, RetryableAction};
use crate::verdict::Failure;

/// One strategy: an id for the log, its retry budget, and the operation.
pub struct Link<'f, T> {
    pub id: String,
    pub policy: RetryPolicy,
    operation: Box<dyn FnMut(u32) -> Result<T> + 'f>,
}

impl<'f, T> Link<'f, T> {
    pub fn new(
        id: impl Into<String>,
        policy: RetryPolicy,
        operation: impl FnMut(u32) -> Result<T> + 'f,
    ) -> Self {
        Self {
            id: id.into(),
            policy,
            operation: Box::new(operation),
        }
    }
}

pub struct FallbackChain<'a, 'f, T> {
    goal: String,
    tag: String,
    sleeper: &'a dyn Sleeper,
    links: Vec<Link<'f, T>>,
}

impl<'a, 'f, T> FallbackChain<'a, 'f, T> {
    pub fn new(tag: impl Into<String>, goal: impl Into<String>, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            goal: goal.into(),
            tag: tag.into(),
            sleeper,
            links: Vec::new(),
        }
    }

    pub fn link(
        mut self,
        id: impl Into<String>,
        policy: RetryPolicy,
        operation: impl FnMut(u32) -> Result<T> + 'f,
    ) -> Self {
        self.links.push(Link::new(id, policy, operation));
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Try each link in order. Returns the first link's value that succeeds.
    pub fn run(self, log: &mut RunLog) -> std::result::Result<T, Failure> {
        let Self {
            goal,
            tag,
            sleeper,
            links,
        } = self;

        if links.is_empty() {
            log.error(&tag, format!("no strategies configured for {}", goal));
            return Err(Failure::new(
                format!("cannot acquire {}", goal),
                Error::EmptyChain(goal),
            ));
        }

        let total = links.len();
        let mut attempted = Vec::with_capacity(total);
        let mut last = None;

        for (index, mut link) in links.into_iter().enumerate() {
            let is_final = index + 1 == total;
            let severity = if is_final { Severity::Error } else { Severity::Info };
            attempted.push(link.id.clone());

            let action = RetryableAction::new(tag.as_str(), link.policy.clone(), sleeper)
                .label(format!("{} via {}", goal, link.id))
                .exhausted_severity(severity);

            match action.run(log, &mut link.operation) {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    if !is_final {
                        log.info(
                            &tag,
                            format!("{} unavailable, falling back", link.id),
                        );
                    }
                    last = Some(failure.cause);
                }
            }
        }

        log.error(
            &tag,
            format!(
                "every strategy for {} failed (tried: {})",
                goal,
                attempted.join(", ")
            ),
        );

        // `links` was non-empty, so at least one failure was recorded.
        let last = last.unwrap_or_else(|| Error::EmptyChain(goal.clone()));
        Err(Failure::new(
            format!("cannot acquire {}", goal),
            Error::FallbackExhausted {
                goal,
                links: attempted,
                last: Box::new(last),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ThreadSleeper;
    use std::cell::Cell;

    fn fail(attempt: u32) -> Error {
        Error::CommandFailed {
            program: "curl".into(),
            code: Some(22),
            stderr: format!("attempt {}", attempt),
        }
    }

    #[test]
    fn test_second_link_runs_after_first_exhausts() {
        let first_calls = Cell::new(0);
        let second_calls = Cell::new(0);
        let mut log = RunLog::new();

        let value = FallbackChain::new("t", "tool", &ThreadSleeper)
            .link("latest", RetryPolicy::new(3, Default::default()).unwrap(), |a| {
                first_calls.set(first_calls.get() + 1);
                Err::<&str, _>(fail(a))
            })
            .link("pinned", RetryPolicy::once(), |_| {
                second_calls.set(second_calls.get() + 1);
                Ok("pinned")
            })
            .run(&mut log)
            .unwrap();

        assert_eq!(value, "pinned");
        assert_eq!(first_calls.get(), 3);
        assert_eq!(second_calls.get(), 1);
        assert_eq!(log.with_severity(Severity::Error).count(), 0);
    }

    #[test]
    fn test_later_links_skipped_on_success() {
        let mut log = RunLog::new();
        let value = FallbackChain::new("t", "tool", &ThreadSleeper)
            .link("latest", RetryPolicy::once(), |_| Ok(1))
            .link("pinned", RetryPolicy::once(), |_| panic!("must not run"))
            .run(&mut log)
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_all_exhausted_lists_links() {
        let mut log = RunLog::new();
        let failure = FallbackChain::new("t", "tool", &ThreadSleeper)
            .link("latest", RetryPolicy::once(), |a| Err::<(), _>(fail(a)))
            .link("pinned", RetryPolicy::once(), |a| Err::<(), _>(fail(a)))
            .run(&mut log)
            .unwrap_err();

        match failure.cause {
            Error::FallbackExhausted { links, last, .. } => {
                assert_eq!(links, vec!["latest", "pinned"]);
                assert!(matches!(*last, Error::Exhausted { .. }));
            }
            other => panic!("unexpected cause: {other}"),
        }
        assert_eq!(log.last().unwrap().severity, Severity::Error);
    }

    #[test]
    fn test_empty_chain() {
        let mut log = RunLog::new();
        let chain: FallbackChain<'_, '_, ()> = FallbackChain::new("t", "tool", &ThreadSleeper);
        assert!(chain.is_empty());
        let failure = chain.run(&mut log).unwrap_err();
        assert!(matches!(failure.cause, Error::EmptyChain(_)));
    }
}
