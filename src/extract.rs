//! Snapshot extraction.
//!
//! Each metric kind is read into a fixed set of named samples. Values are
//! narrowed to `f32` here, the precision the ingestion API stores.

use metric::{Counter, Gauge, GaugeError, Histogram, Meter, Metric, Snapshot, Timer};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use time::TimeUnit;

/// One named sub-measurement of one metric, for one reporting cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The registry name of the metric this sample was read from.
    pub metric: String,
    /// Which measurement this is, eg `count` or `99th`.
    pub field: &'static str,
    /// The unit the value is expressed in, when the field needs one.
    pub unit: Option<&'static str>,
    /// The measurement.
    pub value: f32,
}

impl Sample {
    fn new(metric: &str, field: &'static str, unit: Option<&'static str>, value: f64) -> Sample {
        Sample {
            metric: metric.to_string(),
            field: field,
            unit: unit,
            value: value as f32,
        }
    }

    /// The name fragment identifying this sample within its metric: the field,
    /// followed by `/unit` if there is one.
    pub fn suffix(&self) -> String {
        match self.unit {
            Some(unit) => format!("{}/{}", self.field, unit),
            None => self.field.to_string(),
        }
    }
}

/// The units rates and durations are reported in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    /// Rates are events per this unit.
    pub rate: TimeUnit,
    /// Timer durations are expressed in this unit.
    pub duration: TimeUnit,
}

impl Default for Units {
    fn default() -> Units {
        Units {
            rate: TimeUnit::Seconds,
            duration: TimeUnit::Milliseconds,
        }
    }
}

/// Why a metric could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The gauge's reading function returned an error.
    Gauge(String, GaugeError),
    /// The gauge's reading function panicked.
    Panicked(String, String),
}

impl ExtractionError {
    /// The name of the metric that failed.
    pub fn metric(&self) -> &str {
        match *self {
            ExtractionError::Gauge(ref name, _) | ExtractionError::Panicked(ref name, _) => name,
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ExtractionError::Gauge(ref name, ref e) => {
                write!(f, "could not read gauge {}: {}", name, e)
            }
            ExtractionError::Panicked(ref name, ref msg) => {
                write!(f, "gauge {} panicked while read: {}", name, msg)
            }
        }
    }
}

/// Read `metric`, registered as `name`, into its samples.
///
/// The result is deterministic for an unchanged metric. A gauge that is not
/// numeric, or whose value is not finite in single precision, produces no
/// samples and no error.
pub fn extract(name: &str, metric: &Metric, units: &Units) -> Result<Vec<Sample>, ExtractionError> {
    match *metric {
        Metric::Gauge(ref g) => gauge(name, g),
        Metric::Counter(ref c) => Ok(counter(name, c)),
        Metric::Histogram(ref h) => Ok(histogram(name, h)),
        Metric::Meter(ref m) => Ok(meter(name, m, units)),
        Metric::Timer(ref t) => Ok(timer(name, t, units)),
    }
}

/// Samples of a gauge: `gauge`, or nothing.
pub fn gauge(name: &str, gauge: &Gauge) -> Result<Vec<Sample>, ExtractionError> {
    let reading = match panic::catch_unwind(AssertUnwindSafe(|| gauge.value())) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => return Err(ExtractionError::Gauge(name.to_string(), e)),
        Err(payload) => {
            return Err(ExtractionError::Panicked(
                name.to_string(),
                panic_message(&payload),
            ))
        }
    };
    Ok(reading
        .as_f64()
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .map(|v| vec![Sample::new(name, "gauge", None, f64::from(v))])
        .unwrap_or_default())
}

/// Samples of a counter: `count`.
pub fn counter(name: &str, counter: &Counter) -> Vec<Sample> {
    vec![Sample::new(name, "count", None, counter.count() as f64)]
}

/// Samples of a histogram: the distribution fields, in the histogram's own
/// units.
pub fn histogram(name: &str, histogram: &Histogram) -> Vec<Sample> {
    distribution(name, &histogram.snapshot(), None, |v| v)
}

/// Samples of a meter: `count` plus the four rates in `units.rate`.
pub fn meter(name: &str, meter: &Meter, units: &Units) -> Vec<Sample> {
    rates(
        name,
        meter.count(),
        [
            meter.mean_rate(),
            meter.one_minute_rate(),
            meter.five_minute_rate(),
            meter.fifteen_minute_rate(),
        ],
        units.rate,
    )
}

/// Samples of a timer: the meter fields, then the distribution fields
/// converted from nanoseconds into `units.duration`.
pub fn timer(name: &str, timer: &Timer, units: &Units) -> Vec<Sample> {
    let mut samples = rates(
        name,
        timer.count(),
        [
            timer.mean_rate(),
            timer.one_minute_rate(),
            timer.five_minute_rate(),
            timer.fifteen_minute_rate(),
        ],
        units.rate,
    );
    let duration = units.duration;
    samples.extend(distribution(
        name,
        &timer.snapshot(),
        Some(duration.name()),
        |ns| duration.convert_duration(ns),
    ));
    samples
}

fn rates(name: &str, count: u64, per_second: [f64; 4], unit: TimeUnit) -> Vec<Sample> {
    let tag = Some(unit.singular());
    vec![
        Sample::new(name, "count", None, count as f64),
        Sample::new(name, "meanRate", tag, unit.convert_rate(per_second[0])),
        Sample::new(name, "1MinuteRate", tag, unit.convert_rate(per_second[1])),
        Sample::new(name, "5MinuteRate", tag, unit.convert_rate(per_second[2])),
        Sample::new(name, "15MinuteRate", tag, unit.convert_rate(per_second[3])),
    ]
}

fn distribution<F>(name: &str, snap: &Snapshot, unit: Option<&'static str>, convert: F) -> Vec<Sample>
where
    F: Fn(f64) -> f64,
{
    vec![
        Sample::new(name, "min", unit, convert(snap.min())),
        Sample::new(name, "max", unit, convert(snap.max())),
        Sample::new(name, "mean", unit, convert(snap.mean())),
        Sample::new(name, "stdDev", unit, convert(snap.std_dev())),
        Sample::new(name, "median", unit, convert(snap.median())),
        Sample::new(name, "75th", unit, convert(snap.p75())),
        Sample::new(name, "95th", unit, convert(snap.p95())),
        Sample::new(name, "98th", unit, convert(snap.p98())),
        Sample::new(name, "99th", unit, convert(snap.p99())),
        Sample::new(name, "99.9th", unit, convert(snap.p999())),
    ]
}

/// The message a panic was raised with, if it carried one.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
