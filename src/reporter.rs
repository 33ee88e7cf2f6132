//! The reporting cycle and its scheduler.
//!
//! A `Reporter` owns one transport and runs cycles on demand: snapshot the
//! registry, extract every metric, resolve names, deliver, flush. A
//! `ScheduledReporter` moves a `Reporter` onto its own thread and runs a cycle
//! every interval until stopped.
//!
//! Nothing that goes wrong during a cycle escapes it. Failures are logged,
//! counted in the returned `CycleReport` and in the process-wide totals below,
//! and the next cycle starts from a clean slate.

use constants;
use extract::{self, panic_message, Units};
use metric::Metric;
use mio;
use name;
use registry::{AllMetrics, MetricFilter, Registry};
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thread::{self, ThreadHandle};
use transport::{NamedSample, Outcome, Transport, TransportError};

lazy_static! {
    /// Total reporting cycles run.
    pub static ref REPORT_CYCLES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total samples produced by extraction.
    pub static ref REPORT_SAMPLES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total metrics skipped because they could not be read.
    pub static ref REPORT_EXTRACTION_FAILURE: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total failed deliveries and flushes.
    pub static ref REPORT_TRANSPORT_FAILURE: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// What a reporter reports and how it names and scales it.
#[derive(Clone)]
pub struct ReporterConfig {
    /// Where metrics are read from.
    pub registry: Arc<dyn Registry>,
    /// Prepended to every reported name, if present and not blank.
    pub prefix: Option<String>,
    /// Units for rates and durations.
    pub units: Units,
    /// Metrics not matching the filter are not reported.
    pub filter: Arc<dyn MetricFilter>,
}

impl ReporterConfig {
    /// Report everything in `registry`, unprefixed, in the default units.
    pub fn new(registry: Arc<dyn Registry>) -> ReporterConfig {
        ReporterConfig {
            registry: registry,
            prefix: None,
            units: Units::default(),
            filter: Arc::new(AllMetrics),
        }
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("prefix", &self.prefix)
            .field("units", &self.units)
            .finish()
    }
}

/// Summary of one reporting cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Metrics read.
    pub metrics: usize,
    /// Samples extracted from them.
    pub samples: usize,
    /// Samples the transport confirmed delivered.
    pub delivered: usize,
    /// Metrics skipped because they could not be read.
    pub extraction_failures: usize,
    /// Failed `deliver` and `flush` calls.
    pub transport_failures: usize,
}

impl CycleReport {
    /// True if nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.extraction_failures == 0 && self.transport_failures == 0
    }
}

/// Runs reporting cycles over one transport.
pub struct Reporter<T: Transport> {
    config: ReporterConfig,
    transport: T,
}

impl<T: Transport> Reporter<T> {
    /// Create a new `Reporter`.
    pub fn new(config: ReporterConfig, transport: T) -> Reporter<T> {
        Reporter {
            config: config,
            transport: transport,
        }
    }

    /// The configuration this reporter runs with.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// The transport this reporter delivers to.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn snapshot(&self) -> Vec<(String, Metric)> {
        let registry = &self.config.registry;
        let filter = &*self.config.filter;
        let mut metrics = Vec::new();
        metrics.extend(registry.gauges(filter).into_iter().map(|(n, m)| (n, Metric::Gauge(m))));
        metrics.extend(registry.counters(filter).into_iter().map(|(n, m)| (n, Metric::Counter(m))));
        metrics.extend(
            registry
                .histograms(filter)
                .into_iter()
                .map(|(n, m)| (n, Metric::Histogram(m))),
        );
        metrics.extend(registry.meters(filter).into_iter().map(|(n, m)| (n, Metric::Meter(m))));
        metrics.extend(registry.timers(filter).into_iter().map(|(n, m)| (n, Metric::Timer(m))));
        metrics
    }

    /// Run one reporting cycle.
    ///
    /// Metrics are visited kind by kind (gauges, counters, histograms,
    /// meters, timers) and by name within a kind. A metric that cannot be
    /// read is skipped; a failed delivery loses that delivery only. The
    /// transport is flushed exactly once, at the end.
    pub fn report(&mut self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();
        let prefix = self.config.prefix.as_ref().map(|s| s.as_str());
        let units = self.config.units;

        for (metric_name, metric) in self.snapshot() {
            report.metrics += 1;
            match extract::extract(&metric_name, &metric, &units) {
                Ok(samples) => for sample in samples {
                    report.samples += 1;
                    let named = NamedSample::new(
                        name::resolve(prefix, &sample.metric, &sample.suffix()),
                        sample.value,
                    );
                    let transport = &mut self.transport;
                    let outcome = guarded(|| transport.deliver(&named));
                    tally(&mut report, &outcome, &named.name);
                },
                Err(e) => {
                    warn!("skipping {} metric: {}", metric.kind().name(), e);
                    report.extraction_failures += 1;
                }
            }
        }

        let transport = &mut self.transport;
        let outcome = guarded(|| transport.flush());
        tally(&mut report, &outcome, "flush");

        REPORT_CYCLES.fetch_add(1, Ordering::Relaxed);
        REPORT_SAMPLES.fetch_add(report.samples, Ordering::Relaxed);
        REPORT_EXTRACTION_FAILURE.fetch_add(report.extraction_failures, Ordering::Relaxed);
        REPORT_TRANSPORT_FAILURE.fetch_add(report.transport_failures, Ordering::Relaxed);
        debug!(
            "report cycle done in {:?}: {} metrics, {} samples, {} delivered, {} extraction failures, {} transport failures",
            started.elapsed(),
            report.metrics,
            report.samples,
            report.delivered,
            report.extraction_failures,
            report.transport_failures
        );
        report
    }
}

/// Run a transport call, turning a panic into a failed outcome.
fn guarded<F: FnOnce() -> Outcome>(call: F) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(outcome) => outcome,
        Err(payload) => Outcome::Failed(TransportError::Panicked(panic_message(&payload))),
    }
}

fn tally(report: &mut CycleReport, outcome: &Outcome, what: &str) {
    match *outcome {
        Outcome::Delivered(n) => report.delivered += n,
        Outcome::Skipped => {}
        Outcome::Failed(ref e) => {
            error!("unable to deliver {}: {}", what, e);
            report.transport_failures += 1;
        }
    }
}

/// A `Reporter` running on its own thread every `interval`.
///
/// The first cycle runs one interval after `start`. Dropping a
/// `ScheduledReporter` stops it.
pub struct ScheduledReporter {
    handle: Option<ThreadHandle>,
    interval: Duration,
}

impl ScheduledReporter {
    /// Move `reporter` onto a new thread and report every `interval`.
    pub fn start<T>(mut reporter: Reporter<T>, interval: Duration) -> io::Result<ScheduledReporter>
    where
        T: Transport + Send + 'static,
    {
        let handle = thread::spawn("relic-reporter", move |poll| {
            let mut events = mio::Events::with_capacity(16);
            let mut next = Instant::now() + interval;
            loop {
                let now = Instant::now();
                if now >= next {
                    reporter.report();
                    next += interval;
                    if next <= Instant::now() {
                        // a cycle outran the interval; skip the missed ticks
                        next = Instant::now() + interval;
                    }
                    continue;
                }
                if let Err(e) = poll.poll(&mut events, Some(next - now)) {
                    error!("reporter poll failed, stopping: {}", e);
                    return;
                }
                if events.iter().any(|ev| ev.token() == constants::SYSTEM) {
                    info!("reporter shutting down");
                    return;
                }
            }
        })?;
        info!("reporting every {:?}", interval);
        Ok(ScheduledReporter {
            handle: Some(handle),
            interval: interval,
        })
    }

    /// The time between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True until `stop` has been called.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop reporting and wait for the reporting thread to exit. A cycle in
    /// progress is allowed to finish. Calling `stop` again does nothing.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.shutdown() {
                error!("unable to stop reporter thread cleanly: {}", e);
            }
        }
    }
}

impl Drop for ScheduledReporter {
    fn drop(&mut self) {
        self.stop()
    }
}
