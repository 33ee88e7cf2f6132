//! The registry of live metrics.
//!
//! Reporters consume metrics through the `Registry` trait, which hands out
//! name-ordered, filtered snapshots of each metric kind. `MetricRegistry` is
//! the in-process implementation: the application registers and updates
//! metrics on it from any thread, reporters read it on their own schedule.

use metric::{lock, Counter, Gauge, Histogram, Meter, Metric, MetricKind, Timer};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Decides whether a metric takes part in a report.
pub trait MetricFilter: Send + Sync {
    /// Return true to keep the metric named `name`.
    fn matches(&self, name: &str, metric: &Metric) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&str, &Metric) -> bool + Send + Sync,
{
    fn matches(&self, name: &str, metric: &Metric) -> bool {
        self(name, metric)
    }
}

/// The filter that keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMetrics;

impl MetricFilter for AllMetrics {
    fn matches(&self, _: &str, _: &Metric) -> bool {
        true
    }
}

/// Keeps metrics whose name matches a regular expression anywhere.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pattern: Regex,
}

impl RegexFilter {
    /// Compile `pattern` into a filter.
    pub fn new(pattern: &str) -> Result<RegexFilter, String> {
        Regex::new(pattern)
            .map(|re| RegexFilter { pattern: re })
            .map_err(|e| e.to_string())
    }
}

impl MetricFilter for RegexFilter {
    fn matches(&self, name: &str, _: &Metric) -> bool {
        self.pattern.is_match(name)
    }
}

/// The read side of a metric registry, as consumed by reporters.
///
/// Each method returns the metrics of one kind that pass `filter`, ordered
/// by name. Implementations must be safe to call concurrently with updates
/// to the metrics themselves.
pub trait Registry: Send + Sync {
    /// All gauges passing `filter`.
    fn gauges(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Gauge>>;
    /// All counters passing `filter`.
    fn counters(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Counter>>;
    /// All histograms passing `filter`.
    fn histograms(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Histogram>>;
    /// All meters passing `filter`.
    fn meters(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Meter>>;
    /// All timers passing `filter`.
    fn timers(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Timer>>;
}

/// Registration failures.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// The name is taken by a metric of another kind.
    KindMismatch {
        /// The contested name
        name: String,
        /// What the name is registered as
        existing: MetricKind,
        /// What the caller asked for
        requested: MetricKind,
    },
    /// The name is taken and the metric cannot be shared. Gauges own their
    /// reading function, so two registrations of one name conflict.
    AlreadyExists(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RegistryError::KindMismatch {
                ref name,
                existing,
                requested,
            } => write!(
                f,
                "{} is registered as a {}, not a {}",
                name,
                existing.name(),
                requested.name()
            ),
            RegistryError::AlreadyExists(ref name) => {
                write!(f, "a metric named {} already exists", name)
            }
        }
    }
}

/// The in-process, thread-safe metric registry.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: Mutex<BTreeMap<String, Metric>>,
}

impl MetricRegistry {
    /// Create an empty registry.
    pub fn new() -> MetricRegistry {
        MetricRegistry::default()
    }

    /// Get the counter named `name`, creating it if need be.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        self.get_or_add(name, MetricKind::Counter, as_counter, || {
            Metric::Counter(Arc::new(Counter::new()))
        })
    }

    /// Get the histogram named `name`, creating it if need be.
    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        self.get_or_add(name, MetricKind::Histogram, as_histogram, || {
            Metric::Histogram(Arc::new(Histogram::new()))
        })
    }

    /// Get the meter named `name`, creating it if need be.
    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, RegistryError> {
        self.get_or_add(name, MetricKind::Meter, as_meter, || {
            Metric::Meter(Arc::new(Meter::new()))
        })
    }

    /// Get the timer named `name`, creating it if need be.
    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        self.get_or_add(name, MetricKind::Timer, as_timer, || {
            Metric::Timer(Arc::new(Timer::new()))
        })
    }

    /// Install `gauge` under `name`.
    pub fn register_gauge(&self, name: &str, gauge: Gauge) -> Result<Arc<Gauge>, RegistryError> {
        let gauge = Arc::new(gauge);
        self.register(name, Metric::Gauge(Arc::clone(&gauge)))?;
        Ok(gauge)
    }

    /// Install an already constructed metric under `name`. Useful for metrics
    /// built with a custom clock or window.
    pub fn register(&self, name: &str, metric: Metric) -> Result<(), RegistryError> {
        let mut metrics = lock(&self.metrics);
        if let Some(existing) = metrics.get(name) {
            return Err(if existing.kind() == metric.kind() {
                RegistryError::AlreadyExists(name.to_string())
            } else {
                RegistryError::KindMismatch {
                    name: name.to_string(),
                    existing: existing.kind(),
                    requested: metric.kind(),
                }
            });
        }
        metrics.insert(name.to_string(), metric);
        Ok(())
    }

    /// Remove the metric named `name`, returning it.
    pub fn remove(&self, name: &str) -> Option<Metric> {
        lock(&self.metrics).remove(name)
    }

    /// Names of every registered metric, ordered.
    pub fn names(&self) -> Vec<String> {
        lock(&self.metrics).keys().cloned().collect()
    }

    fn get_or_add<T, E, N>(
        &self,
        name: &str,
        kind: MetricKind,
        extract: E,
        create: N,
    ) -> Result<Arc<T>, RegistryError>
    where
        E: Fn(&Metric) -> Option<Arc<T>>,
        N: FnOnce() -> Metric,
    {
        let mut metrics = lock(&self.metrics);
        let metric: &Metric = metrics.entry(name.to_string()).or_insert_with(create);
        extract(metric).ok_or_else(|| RegistryError::KindMismatch {
            name: name.to_string(),
            existing: metric.kind(),
            requested: kind,
        })
    }

    // The lock is held only to copy out handles. Filters are caller code and
    // run after it is released.
    fn collect<T, E>(&self, filter: &dyn MetricFilter, extract: E) -> BTreeMap<String, Arc<T>>
    where
        E: Fn(&Metric) -> Option<Arc<T>>,
    {
        let candidates: Vec<(String, Metric)> = lock(&self.metrics)
            .iter()
            .filter(|&(_, m)| extract(m).is_some())
            .map(|(n, m)| (n.clone(), m.clone()))
            .collect();
        candidates
            .into_iter()
            .filter(|&(ref n, ref m)| filter.matches(n, m))
            .filter_map(|(n, m)| extract(&m).map(|t| (n, t)))
            .collect()
    }
}

fn as_gauge(m: &Metric) -> Option<Arc<Gauge>> {
    match *m {
        Metric::Gauge(ref g) => Some(Arc::clone(g)),
        _ => None,
    }
}

fn as_counter(m: &Metric) -> Option<Arc<Counter>> {
    match *m {
        Metric::Counter(ref c) => Some(Arc::clone(c)),
        _ => None,
    }
}

fn as_histogram(m: &Metric) -> Option<Arc<Histogram>> {
    match *m {
        Metric::Histogram(ref h) => Some(Arc::clone(h)),
        _ => None,
    }
}

fn as_meter(m: &Metric) -> Option<Arc<Meter>> {
    match *m {
        Metric::Meter(ref me) => Some(Arc::clone(me)),
        _ => None,
    }
}

fn as_timer(m: &Metric) -> Option<Arc<Timer>> {
    match *m {
        Metric::Timer(ref t) => Some(Arc::clone(t)),
        _ => None,
    }
}

impl Registry for MetricRegistry {
    fn gauges(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Gauge>> {
        self.collect(filter, as_gauge)
    }

    fn counters(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Counter>> {
        self.collect(filter, as_counter)
    }

    fn histograms(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Histogram>> {
        self.collect(filter, as_histogram)
    }

    fn meters(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Meter>> {
        self.collect(filter, as_meter)
    }

    fn timers(&self, filter: &dyn MetricFilter) -> BTreeMap<String, Arc<Timer>> {
        self.collect(filter, as_timer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn get_or_create_shares_handles() {
        let registry = MetricRegistry::new();
        let a = registry.counter("requests").unwrap();
        let b = registry.counter("requests").unwrap();
        a.inc();
        assert_eq!(1, b.count());
        assert_eq!(vec!["requests".to_string()], registry.names());
    }

    #[test]
    fn kind_mismatch() {
        let registry = MetricRegistry::new();
        registry.meter("requests").unwrap();
        match registry.timer("requests") {
            Err(RegistryError::KindMismatch {
                existing, requested, ..
            }) => {
                assert_eq!(MetricKind::Meter, existing);
                assert_eq!(MetricKind::Timer, requested);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn gauges_cannot_be_registered_twice() {
        let registry = MetricRegistry::new();
        registry.register_gauge("depth", Gauge::from_fn(|| 1i64)).unwrap();
        assert_eq!(
            Err(RegistryError::AlreadyExists("depth".into())),
            registry
                .register_gauge("depth", Gauge::from_fn(|| 2i64))
                .map(|_| ())
        );
    }

    #[test]
    fn snapshots_are_per_kind_and_ordered() {
        let registry = MetricRegistry::new();
        registry.counter("b.count").unwrap();
        registry.counter("a.count").unwrap();
        registry.timer("a.timer").unwrap();
        registry.register_gauge("a.gauge", Gauge::from_fn(|| 1.5f64)).unwrap();

        let counters: Vec<String> = registry.counters(&AllMetrics).keys().cloned().collect();
        assert_eq!(vec!["a.count".to_string(), "b.count".to_string()], counters);
        assert_eq!(1, registry.timers(&AllMetrics).len());
        assert_eq!(1, registry.gauges(&AllMetrics).len());
        assert!(registry.meters(&AllMetrics).is_empty());
        assert!(registry.histograms(&AllMetrics).is_empty());
    }

    #[test]
    fn filters_apply() {
        let registry = MetricRegistry::new();
        registry.counter("db.reads").unwrap();
        registry.counter("http.requests").unwrap();

        let only_db = RegexFilter::new("^db\\.").unwrap();
        let counters = registry.counters(&only_db);
        assert_eq!(1, counters.len());
        assert!(counters.contains_key("db.reads"));

        let closure = |name: &str, _: &Metric| name.ends_with("requests");
        let counters = registry.counters(&closure);
        assert!(counters.contains_key("http.requests"));
        assert_eq!(1, counters.len());
    }

    #[test]
    fn bad_regex() {
        assert!(RegexFilter::new("(").is_err());
    }

    #[test]
    fn remove() {
        let registry = MetricRegistry::new();
        registry.histogram("sizes").unwrap();
        assert!(registry.remove("sizes").is_some());
        assert!(registry.remove("sizes").is_none());
        assert!(registry.histograms(&AllMetrics).is_empty());
    }

    #[test]
    fn concurrent_updates() {
        let registry = Arc::new(MetricRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    r.counter("shared").unwrap().inc();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(4000, registry.counter("shared").unwrap().count());
    }
}
