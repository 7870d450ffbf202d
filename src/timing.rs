//! Stage timing.

use std::time::{Duration, Instant};

/// Measures how long a stage took.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the timer. Returns the elapsed time and a `"[1.2s] name"` label.
    pub fn finish(self) -> (Duration, String) {
        let elapsed = self.start.elapsed();
        let label = format!("[{}] {}", format_elapsed(elapsed), self.name);
        (elapsed, label)
    }
}

/// Seconds below a minute, minutes above.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_finish_labels_with_name() {
        let (_, label) = Timer::start("checkout_source").finish();
        assert!(label.ends_with("] checkout_source"));
    }
}
