extern crate relic;
#[macro_use]
extern crate serde_json;
extern crate tiny_http;
extern crate url;

use relic::config::{self, Properties};
use relic::metric::{Gauge, GaugeError, GaugeValue};
use relic::registry::MetricRegistry;
use relic::reporter::ScheduledReporter;
use relic::transport::{MetricRecorder, NamedSample, Outcome, Rest, RestConfig, Transport,
                       TransportError};
use serde_json::Value;
use std::io::Read;
use std::process;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Response, Server, StatusCode};

#[derive(Debug)]
struct Received {
    post: bool,
    url: String,
    license: Option<String>,
    content_type: Option<String>,
    accept: Option<String>,
    body: Value,
}

fn header(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn server() -> (Server, String) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/metrics", server.server_addr());
    (server, endpoint)
}

/// Answer one request per status in `statuses`, passing each on.
fn serve(server: Server, statuses: Vec<u16>) -> mpsc::Receiver<Received> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || for status in statuses {
        let mut request = match server.recv() {
            Ok(r) => r,
            Err(_) => return,
        };
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        let received = Received {
            post: *request.method() == tiny_http::Method::Post,
            url: request.url().to_string(),
            license: header(&request, "X-License-Key"),
            content_type: header(&request, "Content-Type"),
            accept: header(&request, "Accept"),
            body: serde_json::from_str(&body).unwrap(),
        };
        let _ = request.respond(Response::from_string("{}").with_status_code(StatusCode(status)));
        if tx.send(received).is_err() {
            return;
        }
    });
    rx
}

fn properties(registry: Arc<MetricRegistry>, endpoint: &str) -> Properties {
    Properties::new()
        .registry(registry)
        .with("license-key", "abc123")
        .with("component-name", "billing")
        .with("app-id", "com.example.billing")
        .with("endpoint", endpoint)
        .with("timeout", "5")
}

fn metric(body: &Value, name: &str) -> Option<f64> {
    body["components"][0]["metrics"][name].as_f64()
}

#[test]
fn timer_end_to_end() {
    let registry = Arc::new(MetricRegistry::new());
    let timer = registry.timer("svc.latency").unwrap();
    timer.update(Duration::from_millis(10));
    timer.update(Duration::from_millis(20));
    timer.update(Duration::from_millis(30));

    let (server, endpoint) = server();
    let rx = serve(server, vec![200]);
    let mut reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();
    let report = reporter.report();

    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(15, report.samples);
    assert_eq!(15, report.delivered);

    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(received.post);
    assert_eq!("/metrics", received.url);
    assert_eq!(Some("abc123".to_string()), received.license);
    assert_eq!(Some("application/json".to_string()), received.content_type);
    assert_eq!(Some("application/json".to_string()), received.accept);

    let body = &received.body;
    assert_eq!(json!(process::id()), body["agent"]["pid"]);
    assert!(body["agent"]["host"].as_str().map_or(false, |h| !h.is_empty()));
    assert_eq!(1, body["components"].as_array().unwrap().len());
    assert_eq!(json!("billing"), body["components"][0]["name"]);
    assert_eq!(json!("com.example.billing"), body["components"][0]["guid"]);
    assert_eq!(json!(60), body["components"][0]["duration"]);
    assert_eq!(15, body["components"][0]["metrics"].as_object().unwrap().len());

    assert_eq!(Some(3.0), metric(body, "svc.latency/count"));
    assert_eq!(Some(10.0), metric(body, "svc.latency/min/milliseconds"));
    assert_eq!(Some(30.0), metric(body, "svc.latency/max/milliseconds"));
    assert_eq!(Some(20.0), metric(body, "svc.latency/mean/milliseconds"));
    assert_eq!(Some(20.0), metric(body, "svc.latency/median/milliseconds"));
    assert!(metric(body, "svc.latency/meanRate/second").unwrap() > 0.0);
    for rate in &["1MinuteRate", "5MinuteRate", "15MinuteRate"] {
        let key = format!("svc.latency/{}/second", rate);
        assert!(metric(body, &key).is_some(), "missing {}", key);
    }
}

#[test]
fn prefix_namespaces_every_key() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("jobs").unwrap().inc_by(5);

    let (server, endpoint) = server();
    let rx = serve(server, vec![200]);
    let props = properties(registry, &endpoint).with("prefix", "Production");
    let mut reporter = config::rest_reporter(&props).unwrap();
    reporter.report();

    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        json!({"Production/jobs/count": 5.0}),
        received.body["components"][0]["metrics"]
    );
}

#[test]
fn server_error_fails_the_flush_and_not_the_next_cycle() {
    let registry = Arc::new(MetricRegistry::new());
    let counter = registry.counter("jobs").unwrap();
    counter.inc();

    let (server, endpoint) = server();
    let rx = serve(server, vec![500, 200]);
    let mut reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();

    let first = reporter.report();
    assert_eq!(1, first.transport_failures);
    assert_eq!(0, first.delivered);
    assert_eq!(Some(1.0), metric(&rx.recv_timeout(Duration::from_secs(5)).unwrap().body, "jobs/count"));

    counter.inc();
    let second = reporter.report();
    assert!(second.is_clean(), "{:?}", second);
    assert_eq!(1, second.delivered);
    assert_eq!(Some(2.0), metric(&rx.recv_timeout(Duration::from_secs(5)).unwrap().body, "jobs/count"));
}

#[test]
fn rest_transport_reports_status() {
    let (server, endpoint) = server();
    let _rx = serve(server, vec![500]);
    let mut rest = Rest::new(RestConfig {
        endpoint: url::Url::parse(&endpoint).unwrap(),
        license_key: "abc123".into(),
        component_name: "billing".into(),
        app_id: "com.example.billing".into(),
        duration: 60,
        timeout: Duration::from_secs(5),
    });
    assert_eq!(Outcome::Skipped, rest.deliver(&NamedSample::new("jobs/count", 1.0)));
    assert_eq!(Outcome::Failed(TransportError::Status(500)), rest.flush());
    // the failed batch is gone
    assert_eq!(Outcome::Skipped, rest.flush());
}

#[test]
fn no_samples_no_request() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .register_gauge("status", Gauge::from_fn(|| "green".to_string()))
        .unwrap();
    registry
        .register_gauge("ratio", Gauge::from_fn(|| ::std::f64::NAN))
        .unwrap();

    let (server, endpoint) = server();
    let mut reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();
    let report = reporter.report();

    assert_eq!(2, report.metrics);
    assert_eq!(0, report.samples);
    assert!(report.is_clean());
    assert!(server.try_recv().unwrap().is_none());
}

#[test]
fn failing_gauge_does_not_block_healthy_metrics() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .register_gauge("broken", Gauge::new(|| Err(GaugeError("no sensor".into()))))
        .unwrap();
    registry
        .register_gauge(
            "panicky",
            Gauge::new(|| -> Result<GaugeValue, GaugeError> { panic!("sensor unplugged") }),
        )
        .unwrap();
    registry.counter("healthy").unwrap().inc_by(5);

    let (server, endpoint) = server();
    let rx = serve(server, vec![200]);
    let mut reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();
    let report = reporter.report();

    assert_eq!(2, report.extraction_failures);
    assert_eq!(0, report.transport_failures);
    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(json!({"healthy/count": 5.0}), received.body["components"][0]["metrics"]);
}

#[derive(Default)]
struct Recorder {
    recorded: Mutex<Vec<(String, f32)>>,
}

impl MetricRecorder for Recorder {
    fn record_metric(&self, name: &str, value: f32) -> Result<(), String> {
        if name.starts_with("refused") {
            return Err("agent not ready".into());
        }
        self.recorded.lock().unwrap().push((name.to_string(), value));
        Ok(())
    }
}

#[test]
fn agent_records_each_value() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("accepted").unwrap().inc_by(2);
    registry.counter("refused").unwrap().inc();
    registry.register_gauge("temperature", Gauge::from_fn(|| 21.5f64)).unwrap();

    let recorder = Arc::new(Recorder::default());
    let props = Properties::new()
        .registry(registry)
        .with("prefix", "Pfx");
    let mut reporter = config::agent_reporter(&props, recorder.clone()).unwrap();
    let report = reporter.report();

    assert_eq!(1, report.transport_failures);
    assert_eq!(2, report.delivered);
    assert_eq!(
        vec![
            ("Pfx/temperature/gauge".to_string(), 21.5),
            ("Pfx/accepted/count".to_string(), 2.0),
        ],
        *recorder.recorded.lock().unwrap()
    );
}

#[test]
fn scheduled_rest_reporting() {
    let registry = Arc::new(MetricRegistry::new());
    registry.meter("ticks").unwrap().mark();

    let (server, endpoint) = server();
    let rx = serve(server, vec![200, 200]);
    let reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();
    let mut scheduled = ScheduledReporter::start(reporter, Duration::from_millis(50)).unwrap();

    for _ in 0..2 {
        let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(Some(1.0), metric(&received.body, "ticks/count"));
    }
    scheduled.stop();
    assert!(!scheduled.is_running());
}

#[test]
fn scheduled_reporting_survives_server_error() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("jobs").unwrap().inc_by(3);

    let (server, endpoint) = server();
    let rx = serve(server, vec![500, 200]);
    let reporter = config::rest_reporter(&properties(registry, &endpoint)).unwrap();
    let mut scheduled = ScheduledReporter::start(reporter, Duration::from_millis(50)).unwrap();

    let failed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(Some(3.0), metric(&failed.body, "jobs/count"));
    let next = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(Some(3.0), metric(&next.body, "jobs/count"));
    scheduled.stop();
}
