//! Time units and clocks.
//!
//! Rates and durations are kept in their natural units inside the metric
//! primitives (events per second and nanoseconds respectively) and are
//! only converted into the operator's preferred unit when a reporter extracts
//! them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A unit of time, used to express rates and durations on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// 10^-9 seconds
    Nanoseconds,
    /// 10^-6 seconds
    Microseconds,
    /// 10^-3 seconds
    Milliseconds,
    /// 1 second
    Seconds,
    /// 60 seconds
    Minutes,
    /// 3600 seconds
    Hours,
    /// 86400 seconds
    Days,
}

impl TimeUnit {
    /// The number of nanoseconds in one of this unit.
    pub fn nanos(&self) -> u64 {
        match *self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 3_600 * 1_000_000_000,
            TimeUnit::Days => 86_400 * 1_000_000_000,
        }
    }

    /// Plural, lowercase name. Used to tag durations, eg `min/milliseconds`.
    pub fn name(&self) -> &'static str {
        match *self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    /// Singular, lowercase name. Used to tag rates, eg `meanRate/second`
    /// reads as events per second.
    pub fn singular(&self) -> &'static str {
        let name = self.name();
        &name[..name.len() - 1]
    }

    /// Convert an events-per-second rate into events per this unit.
    pub fn convert_rate(&self, per_second: f64) -> f64 {
        per_second * (self.nanos() as f64 / 1_000_000_000.0)
    }

    /// Convert a nanosecond duration into this unit.
    pub fn convert_duration(&self, nanos: f64) -> f64 {
        nanos / self.nanos() as f64
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    /// Parse a unit name. Case is ignored and singular, plural and the usual
    /// abbreviations are all accepted, so `SECONDS`, `second` and `s` agree.
    fn from_str(s: &str) -> Result<TimeUnit, String> {
        match s.trim().to_lowercase().as_str() {
            "nanoseconds" | "nanosecond" | "ns" => Ok(TimeUnit::Nanoseconds),
            "microseconds" | "microsecond" | "us" => Ok(TimeUnit::Microseconds),
            "milliseconds" | "millisecond" | "ms" => Ok(TimeUnit::Milliseconds),
            "seconds" | "second" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "minute" | "m" => Ok(TimeUnit::Minutes),
            "hours" | "hour" | "h" => Ok(TimeUnit::Hours),
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            _ => Err(format!("unknown time unit '{}'", s)),
        }
    }
}

/// Convert a `Duration` into whole nanoseconds, saturating.
pub fn duration_ns(dur: Duration) -> u64 {
    (dur.as_secs().saturating_mul(1_000_000_000)).saturating_add(u64::from(dur.subsec_nanos()))
}

/// Nanoseconds elapsed since `i`.
pub fn elapsed_ns(i: Instant) -> u64 {
    duration_ns(i.elapsed())
}

/// A source of monotonic time, in nanoseconds from an arbitrary origin.
///
/// Meters consult their clock to decay moving averages and to compute the
/// mean rate. Tests swap in a `ManualClock` to make that deterministic.
pub trait Clock: Send + Sync {
    /// Current tick in nanoseconds.
    fn tick(&self) -> u64;
}

/// The default clock, backed by `std::time::Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> MonotonicClock {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn tick(&self) -> u64 {
        elapsed_ns(self.origin)
    }
}

/// A clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a new `ManualClock` at tick zero.
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    /// Move the clock forward by `dur`.
    pub fn advance(&self, dur: Duration) {
        self.now.fetch_add(duration_ns(dur), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn tick(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_units_ignores_case_and_plurality() {
        assert_eq!(Ok(TimeUnit::Seconds), "SECONDS".parse());
        assert_eq!(Ok(TimeUnit::Seconds), "second".parse());
        assert_eq!(Ok(TimeUnit::Milliseconds), " ms ".parse());
        assert_eq!(Ok(TimeUnit::Minutes), "Minutes".parse());
        assert!("fortnights".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn unit_names() {
        assert_eq!("milliseconds", TimeUnit::Milliseconds.name());
        assert_eq!("second", TimeUnit::Seconds.singular());
        assert_eq!("day", TimeUnit::Days.singular());
    }

    #[test]
    fn conversions() {
        assert_eq!(2.0, TimeUnit::Seconds.convert_rate(2.0));
        assert_eq!(120.0, TimeUnit::Minutes.convert_rate(2.0));
        assert_eq!(10.0, TimeUnit::Milliseconds.convert_duration(10_000_000.0));
        assert_eq!(0.5, TimeUnit::Seconds.convert_duration(500_000_000.0));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(0, clock.tick());
        clock.advance(Duration::from_millis(1500));
        assert_eq!(1_500_000_000, clock.tick());
    }
}
