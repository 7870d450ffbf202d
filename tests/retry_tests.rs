//! Retry and fallback behavior as seen from outside the crate.

mod helpers;

use std::cell::Cell;
use std::time::Duration;

use helpers::RecordingSleeper;
use hostprep::error::Error;
use hostprep::fallback::FallbackChain;
use hostprep::log::{RunLog, Severity};
use hostprep::retry::{Backoff, RetryPolicy, RetryableAction};

fn transient(attempt: u32) -> Error {
    Error::CommandFailed {
        program: "curl".to_string(),
        code: Some(7),
        stderr: format!("connection refused (attempt {})", attempt),
    }
}

// =============================================================================
// RetryableAction
// =============================================================================

#[test]
fn test_always_failing_operation_runs_exactly_max_attempts() {
    for max in 1..=8 {
        let sleeper = RecordingSleeper::default();
        let mut log = RunLog::new();
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(max, Duration::from_secs(1)).unwrap();

        let result = RetryableAction::new("t", policy, &sleeper).run(&mut log, |attempt| {
            calls.set(calls.get() + 1);
            Err::<(), _>(transient(attempt))
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), max, "max_attempts = {}", max);
        assert_eq!(sleeper.sleeps.borrow().len() as u32, max - 1);
        assert_eq!(log.with_severity(Severity::Warn).count() as u32, max);
        assert_eq!(log.with_severity(Severity::Error).count(), 1);
    }
}

#[test]
fn test_operation_succeeding_on_attempt_k_runs_k_times() {
    for max in 1..=6 {
        for k in 1..=max {
            let sleeper = RecordingSleeper::default();
            let mut log = RunLog::new();
            let calls = Cell::new(0);
            let policy = RetryPolicy::new(max, Duration::ZERO).unwrap();

            let value = RetryableAction::new("t", policy, &sleeper)
                .run(&mut log, |attempt| {
                    calls.set(calls.get() + 1);
                    if attempt < k {
                        Err(transient(attempt))
                    } else {
                        Ok(attempt * 10)
                    }
                })
                .unwrap();

            assert_eq!(value, k * 10);
            assert_eq!(calls.get(), k);
            assert_eq!(log.with_severity(Severity::Warn).count() as u32, k - 1);
            assert_eq!(log.last().unwrap().severity, Severity::Info);
        }
    }
}

#[test]
fn test_exponential_delays_between_attempts() {
    let sleeper = RecordingSleeper::default();
    let mut log = RunLog::new();
    let policy = RetryPolicy::new(7, Duration::from_millis(100))
        .unwrap()
        .with_backoff(Backoff::Exponential);

    let _ = RetryableAction::new("t", policy, &sleeper)
        .run(&mut log, |attempt| Err::<(), _>(transient(attempt)));

    let millis: Vec<u128> = sleeper
        .sleeps
        .borrow()
        .iter()
        .map(|d| d.as_millis())
        .collect();
    assert_eq!(millis, vec![100, 200, 400, 800, 1600, 1600]);
}

// =============================================================================
// FallbackChain
// =============================================================================

#[test]
fn test_fallback_failing_primary_then_working_alternate() {
    let sleeper = RecordingSleeper::default();
    let mut log = RunLog::new();
    let primary = Cell::new(0);
    let alternate = Cell::new(0);

    let id = FallbackChain::new("acquire", "tool", &sleeper)
        .link("A", RetryPolicy::new(2, Duration::ZERO).unwrap(), |attempt| {
            primary.set(primary.get() + 1);
            Err(transient(attempt))
        })
        .link("B", RetryPolicy::once(), |_| {
            alternate.set(alternate.get() + 1);
            Ok("B")
        })
        .run(&mut log)
        .unwrap();

    assert_eq!(id, "B");
    assert_eq!(primary.get(), 2);
    assert_eq!(alternate.get(), 1);

    // Evidence of both links in the log.
    let messages: Vec<&str> = log.records().iter().map(|r| r.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("via A") && m.contains("failed")));
    assert!(messages.iter().any(|m| m.contains("via B") && m.contains("succeeded")));
    assert_eq!(log.with_severity(Severity::Error).count(), 0);
}

#[test]
fn test_fallback_all_failing_names_every_link() {
    let sleeper = RecordingSleeper::default();
    let mut log = RunLog::new();

    let failure = FallbackChain::new("acquire", "tool", &sleeper)
        .link("mirror-a", RetryPolicy::once(), |a| Err::<(), _>(transient(a)))
        .link("mirror-b", RetryPolicy::once(), |a| Err::<(), _>(transient(a)))
        .link("mirror-c", RetryPolicy::once(), |a| Err::<(), _>(transient(a)))
        .run(&mut log)
        .unwrap_err();

    let diagnostic = failure.to_string();
    for id in ["mirror-a", "mirror-b", "mirror-c"] {
        assert!(diagnostic.contains(id), "{} missing from: {}", id, diagnostic);
    }
    // Only the final link's exhaustion and the chain summary are errors.
    assert_eq!(log.with_severity(Severity::Error).count(), 2);
}
