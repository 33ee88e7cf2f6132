#![allow(unknown_lints)]

extern crate chan_signal;
extern crate chrono;
extern crate fern;
extern crate rand;
extern crate relic;

#[macro_use]
extern crate log;

use chrono::Utc;
use rand::Rng;
use relic::config::{self, Properties};
use relic::metric::Gauge;
use relic::registry::MetricRegistry;
use relic::reporter::{ScheduledReporter, REPORT_CYCLES};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Feed a timer with random sleeps until told to stop, so there is something
/// to report.
fn workload(registry: &MetricRegistry, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    let latency = registry.timer("relic.demo.latency");
    let requests = registry.counter("relic.demo.requests");
    let (latency, requests) = match (latency, requests) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => {
            error!("unable to register demo metrics: {}", e);
            process::exit(1);
        }
    };
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        while running.load(Ordering::Relaxed) {
            let ctx = latency.time();
            thread::sleep(Duration::from_millis(rng.gen_range(10, 250)));
            ctx.stop();
            requests.inc();
        }
    })
}

fn main() {
    let args = config::parse_args();

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let signal = chan_signal::notify(&[chan_signal::Signal::INT, chan_signal::Signal::TERM]);

    if let Err(e) = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("relic"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
    {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("relic - {}", relic::constants::VERSION);

    let registry = Arc::new(MetricRegistry::new());
    let props = match Properties::from_file(&args.config_file) {
        Ok(p) => p.registry(registry.clone()),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let interval = match props.duration() {
        Ok(secs) => Duration::from_secs(secs),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let cycles = Gauge::from_fn(|| REPORT_CYCLES.load(Ordering::Relaxed));
    if let Err(e) = registry.register_gauge("relic.reporter.cycles", cycles) {
        error!("unable to register reporter gauge: {}", e);
    }

    let started = if args.console {
        config::console_reporter(&props).map(|r| ScheduledReporter::start(r, interval))
    } else {
        config::rest_reporter(&props).map(|r| ScheduledReporter::start(r, interval))
    };
    let mut scheduled = match started {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            error!("unable to start reporter thread: {}", e);
            process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let worker = workload(&registry, running.clone());

    if let Some(sig) = signal.recv() {
        info!("received {:?}, shutting down", sig);
    }
    running.store(false, Ordering::Relaxed);
    scheduled.stop();
    if worker.join().is_err() {
        error!("demo workload panicked");
    }
}
