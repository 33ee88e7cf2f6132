use std::fmt;

/// The value a `Gauge` samples.
///
/// Only the numeric variants are reportable. Text and boolean gauges are
/// legal to register, since other consumers of a registry may want them, but
/// reporters skip them.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    /// A signed integer reading
    Integer(i64),
    /// A floating point reading, possibly NaN or infinite
    Float(f64),
    /// A boolean flag
    Boolean(bool),
    /// Free-form text
    Text(String),
}

impl GaugeValue {
    /// The reading as an `f64`, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            GaugeValue::Integer(i) => Some(i as f64),
            GaugeValue::Float(f) => Some(f),
            GaugeValue::Boolean(_) | GaugeValue::Text(_) => None,
        }
    }
}

impl From<i64> for GaugeValue {
    fn from(i: i64) -> GaugeValue {
        GaugeValue::Integer(i)
    }
}

impl From<usize> for GaugeValue {
    fn from(i: usize) -> GaugeValue {
        GaugeValue::Integer(i as i64)
    }
}

impl From<f64> for GaugeValue {
    fn from(f: f64) -> GaugeValue {
        GaugeValue::Float(f)
    }
}

impl From<f32> for GaugeValue {
    fn from(f: f32) -> GaugeValue {
        GaugeValue::Float(f64::from(f))
    }
}

impl From<bool> for GaugeValue {
    fn from(b: bool) -> GaugeValue {
        GaugeValue::Boolean(b)
    }
}

impl From<String> for GaugeValue {
    fn from(s: String) -> GaugeValue {
        GaugeValue::Text(s)
    }
}

/// The reason a gauge could not produce a reading.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeError(pub String);

impl fmt::Display for GaugeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Reading = dyn Fn() -> Result<GaugeValue, GaugeError> + Send + Sync;

/// A sampled value, computed on demand.
///
/// The gauge owns a closure that is called each time the gauge is read. The
/// closure may fail, in which case the reading is skipped for that cycle.
pub struct Gauge {
    reading: Box<Reading>,
}

impl Gauge {
    /// Create a gauge from a fallible reading function.
    pub fn new<F>(f: F) -> Gauge
    where
        F: Fn() -> Result<GaugeValue, GaugeError> + Send + Sync + 'static,
    {
        Gauge {
            reading: Box::new(f),
        }
    }

    /// Create a gauge from an infallible reading function.
    pub fn from_fn<F, V>(f: F) -> Gauge
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<GaugeValue>,
    {
        Gauge::new(move || Ok(f().into()))
    }

    /// Take a reading.
    pub fn value(&self) -> Result<GaugeValue, GaugeError> {
        (self.reading)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Gauge { .. }")
    }
}
