//! Value distributions.
//!
//! A `Histogram` keeps a sliding window of the most recent values it has been
//! given and computes summary statistics over that window on demand. The
//! window is what makes a histogram 'rolling': old values fall out as new
//! values arrive, so a report reflects recent behaviour rather than the whole
//! life of the process.

use super::lock;
use std::sync::Mutex;

/// The number of values a histogram retains unless told otherwise.
pub const DEFAULT_WINDOW: usize = 1028;

#[derive(Debug)]
struct Window {
    values: Vec<i64>,
    next: usize,
    count: u64,
}

/// A sliding-window distribution of `i64` values.
#[derive(Debug)]
pub struct Histogram {
    size: usize,
    window: Mutex<Window>,
}

impl Default for Histogram {
    fn default() -> Histogram {
        Histogram::with_window(DEFAULT_WINDOW)
    }
}

impl Histogram {
    /// Create a new `Histogram` retaining `DEFAULT_WINDOW` values.
    pub fn new() -> Histogram {
        Histogram::default()
    }

    /// Create a new `Histogram` retaining the most recent `size` values. A
    /// size of zero is bumped to one.
    pub fn with_window(size: usize) -> Histogram {
        let size = if size == 0 { 1 } else { size };
        Histogram {
            size: size,
            window: Mutex::new(Window {
                values: Vec::with_capacity(size),
                next: 0,
                count: 0,
            }),
        }
    }

    /// Record a value.
    pub fn update(&self, value: i64) {
        let mut window = lock(&self.window);
        if window.values.len() < self.size {
            window.values.push(value);
        } else {
            let idx = window.next;
            window.values[idx] = value;
        }
        window.next = (window.next + 1) % self.size;
        window.count = window.count.saturating_add(1);
    }

    /// Total values ever recorded, including those that have left the window.
    pub fn count(&self) -> u64 {
        lock(&self.window).count
    }

    /// Summarize the values currently in the window.
    pub fn snapshot(&self) -> Snapshot {
        let values = lock(&self.window).values.clone();
        Snapshot::new(values)
    }
}

/// A point-in-time statistical summary of a set of values.
///
/// Every statistic of an empty snapshot is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    /// Create a snapshot from unordered values.
    pub fn new(mut values: Vec<i64>) -> Snapshot {
        values.sort();
        Snapshot { values: values }
    }

    /// Number of values summarized.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Smallest value.
    pub fn min(&self) -> f64 {
        self.values.first().map_or(0.0, |v| *v as f64)
    }

    /// Largest value.
    pub fn max(&self) -> f64 {
        self.values.last().map_or(0.0, |v| *v as f64)
    }

    /// Arithmetic mean.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|v| *v as f64).sum();
        sum / self.values.len() as f64
    }

    /// Sample standard deviation. Zero for fewer than two values.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        let sum: f64 = self.values
            .iter()
            .map(|v| {
                let diff = *v as f64 - mean;
                diff * diff
            })
            .sum();
        (sum / (n - 1) as f64).sqrt()
    }

    /// The value at `quantile`, interpolating between neighbours.
    ///
    /// `quantile` is clamped to [0.0, 1.0].
    pub fn value(&self, quantile: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let quantile = if quantile.is_nan() {
            0.0
        } else {
            quantile.max(0.0).min(1.0)
        };
        let pos = quantile * (n + 1) as f64;
        let index = pos as usize;
        if index < 1 {
            return self.values[0] as f64;
        }
        if index >= n {
            return self.values[n - 1] as f64;
        }
        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    /// 50th percentile.
    pub fn median(&self) -> f64 {
        self.value(0.5)
    }

    /// 75th percentile.
    pub fn p75(&self) -> f64 {
        self.value(0.75)
    }

    /// 95th percentile.
    pub fn p95(&self) -> f64 {
        self.value(0.95)
    }

    /// 98th percentile.
    pub fn p98(&self) -> f64 {
        self.value(0.98)
    }

    /// 99th percentile.
    pub fn p99(&self) -> f64 {
        self.value(0.99)
    }

    /// 99.9th percentile.
    pub fn p999(&self) -> f64 {
        self.value(0.999)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn empty_snapshot_is_zero() {
        let snap = Histogram::new().snapshot();
        assert_eq!(0, snap.size());
        assert_eq!(0.0, snap.min());
        assert_eq!(0.0, snap.max());
        assert_eq!(0.0, snap.mean());
        assert_eq!(0.0, snap.std_dev());
        assert_eq!(0.0, snap.p999());
    }

    #[test]
    fn three_values() {
        let hist = Histogram::new();
        hist.update(30);
        hist.update(10);
        hist.update(20);
        let snap = hist.snapshot();

        assert_eq!(3, hist.count());
        assert_eq!(10.0, snap.min());
        assert_eq!(30.0, snap.max());
        assert_eq!(20.0, snap.mean());
        assert_eq!(10.0, snap.std_dev());
        assert_eq!(20.0, snap.median());
        assert_eq!(30.0, snap.p99());
    }

    #[test]
    fn percentiles() {
        let hist = Histogram::new();
        for i in 1..101 {
            hist.update(i);
        }
        let snap = hist.snapshot();

        assert_eq!(1.0, snap.min());
        assert_eq!(100.0, snap.max());
        assert_eq!(50.5, snap.median());
        assert_eq!(75.75, snap.p75());
        assert_eq!(100.0, snap.p999());
    }

    #[test]
    fn window_slides() {
        let hist = Histogram::with_window(3);
        for i in 1..7 {
            hist.update(i * 10);
        }
        let snap = hist.snapshot();

        assert_eq!(6, hist.count());
        assert_eq!(3, snap.size());
        assert_eq!(40.0, snap.min());
        assert_eq!(60.0, snap.max());
    }

    #[test]
    fn quantiles_bounded_by_min_max() {
        fn inner(values: Vec<i32>, q: f64) -> TestResult {
            if values.is_empty() {
                return TestResult::discard();
            }
            let snap = Snapshot::new(values.into_iter().map(i64::from).collect());
            let v = snap.value(q);
            assert!(v >= snap.min());
            assert!(v <= snap.max());
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<i32>, f64) -> TestResult);
    }
}
