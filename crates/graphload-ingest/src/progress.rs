//! Upload progress counters
//!
//! Two atomic tallies shared by every upload task, plus an optional live
//! status line. The status line is cosmetic: concurrent tasks may redraw it
//! out of order.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub inserted: u64,
    pub existing: u64,
}

pub struct ProgressCounters {
    inserted: AtomicU64,
    existing: AtomicU64,
    status: ProgressBar,
    noun: std::sync::Mutex<&'static str>,
}

impl ProgressCounters {
    /// Counters with a spinner status line on stderr
    pub fn with_status_line() -> Self {
        let status = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            status.set_style(style);
        }
        status.enable_steady_tick(Duration::from_millis(120));
        Self::from_bar(status)
    }

    /// Counters without any terminal output
    pub fn hidden() -> Self {
        Self::from_bar(ProgressBar::hidden())
    }

    fn from_bar(status: ProgressBar) -> Self {
        Self {
            inserted: AtomicU64::new(0),
            existing: AtomicU64::new(0),
            status,
            noun: std::sync::Mutex::new("records"),
        }
    }

    /// Name the element kind shown on the status line ("nodes", "edges")
    pub fn set_noun(&self, noun: &'static str) {
        if let Ok(mut current) = self.noun.lock() {
            *current = noun;
        }
        self.render();
    }

    pub fn record_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
        self.render();
    }

    pub fn record_existing(&self) {
        self.existing.fetch_add(1, Ordering::Relaxed);
        self.render();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            inserted: self.inserted.load(Ordering::Relaxed),
            existing: self.existing.load(Ordering::Relaxed),
        }
    }

    /// Return the current totals and start again from zero
    pub fn reset(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            inserted: self.inserted.swap(0, Ordering::Relaxed),
            existing: self.existing.swap(0, Ordering::Relaxed),
        }
    }

    pub fn status_message(&self) -> String {
        let noun = self.noun.lock().map(|n| *n).unwrap_or("records");
        let snapshot = self.snapshot();
        format!(
            "Uploaded {} {} and found {} existing {}",
            snapshot.inserted, noun, snapshot.existing, noun
        )
    }

    fn render(&self) {
        if !self.status.is_hidden() {
            self.status.set_message(self.status_message());
        }
    }

    /// Stop the spinner, leaving the last status line visible
    pub fn finish(&self) {
        self.status.finish_with_message(self.status_message());
    }
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::hidden()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_and_reset() {
        let counters = ProgressCounters::hidden();
        counters.record_inserted();
        counters.record_inserted();
        counters.record_existing();

        assert_eq!(
            counters.snapshot(),
            ProgressSnapshot {
                inserted: 2,
                existing: 1
            }
        );
        assert_eq!(counters.reset().inserted, 2);
        assert_eq!(counters.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn test_status_message() {
        let counters = ProgressCounters::hidden();
        counters.set_noun("nodes");
        counters.record_inserted();
        assert_eq!(
            counters.status_message(),
            "Uploaded 1 nodes and found 0 existing nodes"
        );
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = Arc::new(ProgressCounters::hidden());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counters.record_inserted();
                        counters.record_existing();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.inserted, 1000);
        assert_eq!(snapshot.existing, 1000);
    }
}
