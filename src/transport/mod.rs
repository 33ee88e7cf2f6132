//! Delivery of named samples to their destination.
//!
//! A reporter hands each named sample of a cycle to `Transport::deliver` and
//! then calls `Transport::flush` exactly once. Batching transports do their
//! real work in `flush`, streaming transports in `deliver`.

use std::fmt;

mod agent;
mod console;
mod rest;

pub use self::agent::{Agent, MetricRecorder};
pub use self::console::Console;
pub use self::rest::{Rest, RestConfig};

/// A sample after name resolution: the key it is reported under and its
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSample {
    /// Fully resolved metric name, eg `Pfx/svc.latency/min/milliseconds`.
    pub name: String,
    /// The value to report.
    pub value: f32,
}

impl NamedSample {
    /// Create a new `NamedSample`.
    pub fn new<S: Into<String>>(name: S, value: f32) -> NamedSample {
        NamedSample {
            name: name.into(),
            value: value,
        }
    }
}

/// Why a delivery failed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// The request could not be completed: connection refused, timeout and
    /// the like.
    Network(String),
    /// The payload could not be encoded.
    Serialization(String),
    /// The in-process recorder refused a value.
    Recorder(String),
    /// The transport panicked while delivering or flushing.
    Panicked(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::Status(code) => write!(f, "endpoint responded with status {}", code),
            TransportError::Network(ref e) => write!(f, "network error: {}", e),
            TransportError::Serialization(ref e) => write!(f, "could not serialize payload: {}", e),
            TransportError::Recorder(ref e) => write!(f, "recorder error: {}", e),
            TransportError::Panicked(ref e) => write!(f, "transport panicked: {}", e),
        }
    }
}

/// Result of a `deliver` or `flush` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// This many values reached the destination.
    Delivered(usize),
    /// Nothing needed doing: a batching transport accepting a sample, or a
    /// flush with nothing to send.
    Skipped,
    /// The values were lost.
    Failed(TransportError),
}

impl Outcome {
    /// True if the outcome is a failure.
    pub fn is_failed(&self) -> bool {
        match *self {
            Outcome::Failed(_) => true,
            _ => false,
        }
    }
}

/// A destination for named samples.
pub trait Transport {
    /// Accept one sample of the current cycle.
    fn deliver(&mut self, sample: &NamedSample) -> Outcome;
    /// End the current cycle. Nothing accepted before a flush may be sent
    /// after it.
    fn flush(&mut self) -> Outcome;
}

impl<'a, T: Transport + ?Sized> Transport for &'a mut T {
    fn deliver(&mut self, sample: &NamedSample) -> Outcome {
        (**self).deliver(sample)
    }

    fn flush(&mut self) -> Outcome {
        (**self).flush()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn deliver(&mut self, sample: &NamedSample) -> Outcome {
        (**self).deliver(sample)
    }

    fn flush(&mut self) -> Outcome {
        (**self).flush()
    }
}
