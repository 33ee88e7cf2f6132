use super::{Histogram, Meter, Snapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::{self, Clock};

/// A meter of events plus a histogram of how long each took.
///
/// Durations are recorded in nanoseconds. Reporters convert them into the
/// configured duration unit on extraction.
#[derive(Debug, Default)]
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    /// Create a new `Timer` on the system monotonic clock.
    pub fn new() -> Timer {
        Timer::default()
    }

    /// Create a new `Timer` whose rates are computed from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Timer {
        Timer {
            meter: Meter::with_clock(clock),
            histogram: Histogram::new(),
        }
    }

    /// Record one event of the given duration.
    pub fn update(&self, duration: Duration) {
        let ns = time::duration_ns(duration);
        self.update_ns(if ns > i64::max_value() as u64 {
            i64::max_value()
        } else {
            ns as i64
        })
    }

    /// Record one event of `ns` nanoseconds.
    pub fn update_ns(&self, ns: i64) {
        if ns >= 0 {
            self.histogram.update(ns);
            self.meter.mark();
        }
    }

    /// Start timing an event. The event is recorded when the returned guard
    /// is stopped or dropped.
    pub fn time(&self) -> TimerContext {
        TimerContext {
            timer: self,
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Total events recorded.
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Events per second since creation.
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// One-minute moving average rate, events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    /// Five-minute moving average rate, events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    /// Fifteen-minute moving average rate, events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    /// Summary of recent durations, in nanoseconds.
    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }
}

/// An in-flight timing, see `Timer::time`.
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: Instant,
    stopped: bool,
}

impl<'a> TimerContext<'a> {
    /// Stop timing and record the elapsed duration, returning it.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.update(elapsed);
        }
        elapsed
    }
}

impl<'a> Drop for TimerContext<'a> {
    fn drop(&mut self) {
        self.record();
    }
}
