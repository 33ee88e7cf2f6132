//! The metric primitives a registry holds.
//!
//! There are exactly five kinds of metric and a `Metric` is one of them.
//! Extraction matches on `Metric` exhaustively.

use std::sync::{Arc, Mutex, MutexGuard};

mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use self::counter::Counter;
pub use self::gauge::{Gauge, GaugeError, GaugeValue};
pub use self::histogram::{Histogram, Snapshot, DEFAULT_WINDOW};
pub use self::meter::Meter;
pub use self::timer::{Timer, TimerContext};

/// The kind of a `Metric`, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    /// See `Gauge`
    Gauge,
    /// See `Counter`
    Counter,
    /// See `Histogram`
    Histogram,
    /// See `Meter`
    Meter,
    /// See `Timer`
    Timer,
}

impl MetricKind {
    /// Lowercase name of the kind.
    pub fn name(&self) -> &'static str {
        match *self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

/// A shared handle to one live metric.
#[derive(Debug, Clone)]
pub enum Metric {
    /// A sampled value
    Gauge(Arc<Gauge>),
    /// A running count
    Counter(Arc<Counter>),
    /// A distribution of values
    Histogram(Arc<Histogram>),
    /// A rate of events
    Meter(Arc<Meter>),
    /// A rate of events plus a distribution of their durations
    Timer(Arc<Timer>),
}

impl Metric {
    /// The kind of this metric.
    pub fn kind(&self) -> MetricKind {
        match *self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }
}

impl From<Arc<Gauge>> for Metric {
    fn from(g: Arc<Gauge>) -> Metric {
        Metric::Gauge(g)
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(c: Arc<Counter>) -> Metric {
        Metric::Counter(c)
    }
}

impl From<Arc<Histogram>> for Metric {
    fn from(h: Arc<Histogram>) -> Metric {
        Metric::Histogram(h)
    }
}

impl From<Arc<Meter>> for Metric {
    fn from(m: Arc<Meter>) -> Metric {
        Metric::Meter(m)
    }
}

impl From<Arc<Timer>> for Metric {
    fn from(t: Arc<Timer>) -> Metric {
        Metric::Timer(t)
    }
}

// Poisoning is ignored. No metric update leaves its state half-written.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
