use std::sync::atomic::{AtomicIsize, Ordering};

/// A monotonic-ish count of things.
///
/// Counters may be decremented, for a count of open connections say, but are
/// reported as the then-current total each cycle, never as a delta. A missed
/// report is therefore invisible downstream.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicIsize,
}

impl Counter {
    /// Create a new `Counter` at zero.
    pub fn new() -> Counter {
        Counter::default()
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.inc_by(1)
    }

    /// Increment by `n`.
    pub fn inc_by(&self, n: isize) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Decrement by one.
    pub fn dec(&self) {
        self.dec_by(1)
    }

    /// Decrement by `n`.
    pub fn dec_by(&self, n: isize) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// The current count.
    pub fn count(&self) -> isize {
        self.count.load(Ordering::Relaxed)
    }
}
