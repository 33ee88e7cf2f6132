//! Relic reports in-process application metrics to a plugin ingestion
//! endpoint on a fixed schedule. Applications register counters, gauges,
//! histograms, meters and timers on a `MetricRegistry` and update them from
//! wherever convenient. A reporter periodically snapshots the registry,
//! derives the usual statistics from each metric, names them into a flat
//! `prefix/metric/field/unit` namespace and delivers them.
//!
//! Delivery happens one of three ways:
//!
//!  * POSTed as a single JSON payload per cycle to a REST endpoint, with the
//!    account's license key as a header.
//!  * Handed value by value to an agent embedded in the host process.
//!  * Printed to stdout, for a look at what would be sent.
//!
//! A cycle never fails outright. A metric that cannot be read is skipped, a
//! delivery that fails is logged and dropped, and the next cycle starts over
//! with fresh values.
//!
//! ```no_run
//! extern crate relic;
//!
//! use relic::config::{self, Properties};
//! use relic::registry::MetricRegistry;
//! use relic::reporter::ScheduledReporter;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() {
//!     let registry = Arc::new(MetricRegistry::new());
//!     let requests = registry.meter("http.requests").unwrap();
//!
//!     let props = Properties::new()
//!         .registry(registry.clone())
//!         .with("license-key", "0123456789abcdef")
//!         .with("component-name", "billing")
//!         .with("app-id", "com.example.billing");
//!     let reporter = config::rest_reporter(&props).unwrap();
//!     let mut scheduled = ScheduledReporter::start(reporter, Duration::from_secs(60)).unwrap();
//!
//!     requests.mark();
//!     scheduled.stop();
//! }
//! ```
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate hyper;
extern crate libc;
extern crate mio;
extern crate regex;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate toml;
extern crate url;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod config;
pub mod constants;
pub mod extract;
pub mod metric;
pub mod name;
pub mod payload;
pub mod registry;
pub mod reporter;
pub mod thread;
pub mod time;
pub mod transport;
