use extract::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use super::{NamedSample, Outcome, Transport, TransportError};

/// An in-process agent able to record one named value at a time.
///
/// This is the seam to whatever monitoring agent the host process embeds.
/// Implementations must be cheap to call; they run on the reporting thread.
pub trait MetricRecorder: Send + Sync {
    /// Record `value` under `name`.
    fn record_metric(&self, name: &str, value: f32) -> Result<(), String>;
}

impl<F> MetricRecorder for F
where
    F: Fn(&str, f32) -> Result<(), String> + Send + Sync,
{
    fn record_metric(&self, name: &str, value: f32) -> Result<(), String> {
        self(name, value)
    }
}

/// Hands each sample straight to a `MetricRecorder`. There is no batching;
/// `flush` does nothing. A recorder that panics fails that one sample, the
/// same as one returning an error.
pub struct Agent {
    recorder: Arc<dyn MetricRecorder>,
}

impl Agent {
    /// Create a new `Agent` transport over `recorder`.
    pub fn new(recorder: Arc<dyn MetricRecorder>) -> Agent {
        Agent { recorder: recorder }
    }
}

impl Transport for Agent {
    fn deliver(&mut self, sample: &NamedSample) -> Outcome {
        let recorder = &self.recorder;
        let recorded = panic::catch_unwind(AssertUnwindSafe(|| {
            recorder.record_metric(&sample.name, sample.value)
        }));
        match recorded {
            Ok(Ok(())) => Outcome::Delivered(1),
            Ok(Err(e)) => Outcome::Failed(TransportError::Recorder(e)),
            Err(payload) => Outcome::Failed(TransportError::Recorder(format!(
                "panicked: {}",
                panic_message(&payload)
            ))),
        }
    }

    fn flush(&mut self) -> Outcome {
        Outcome::Skipped
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        values: Mutex<Vec<(String, f32)>>,
    }

    impl MetricRecorder for Recorded {
        fn record_metric(&self, name: &str, value: f32) -> Result<(), String> {
            if name.starts_with("bad") {
                return Err(format!("refusing {}", name));
            }
            if name.starts_with("explode") {
                panic!("recorder blew up on {}", name);
            }
            self.values.lock().unwrap().push((name.to_string(), value));
            Ok(())
        }
    }

    #[test]
    fn records_each_sample() {
        let recorded = Arc::new(Recorded::default());
        let mut agent = Agent::new(recorded.clone());
        assert_eq!(Outcome::Delivered(1), agent.deliver(&NamedSample::new("a/count", 1.0)));
        assert_eq!(Outcome::Delivered(1), agent.deliver(&NamedSample::new("b/count", 2.0)));
        assert_eq!(Outcome::Skipped, agent.flush());
        assert_eq!(
            vec![("a/count".to_string(), 1.0), ("b/count".to_string(), 2.0)],
            *recorded.values.lock().unwrap()
        );
    }

    #[test]
    fn refusal_fails_only_that_sample() {
        let recorded = Arc::new(Recorded::default());
        let mut agent = Agent::new(recorded.clone());
        assert_eq!(
            Outcome::Failed(TransportError::Recorder("refusing bad/count".into())),
            agent.deliver(&NamedSample::new("bad/count", 1.0))
        );
        assert_eq!(Outcome::Delivered(1), agent.deliver(&NamedSample::new("good/count", 2.0)));
        assert_eq!(1, recorded.values.lock().unwrap().len());
    }

    #[test]
    fn panicking_recorder_fails_only_that_sample() {
        let recorded = Arc::new(Recorded::default());
        let mut agent = Agent::new(recorded.clone());
        assert_eq!(
            Outcome::Failed(TransportError::Recorder(
                "panicked: recorder blew up on explode/count".into()
            )),
            agent.deliver(&NamedSample::new("explode/count", 1.0))
        );
        assert_eq!(Outcome::Delivered(1), agent.deliver(&NamedSample::new("good/count", 2.0)));
        assert_eq!(
            vec![("good/count".to_string(), 2.0)],
            *recorded.values.lock().unwrap()
        );
    }

    #[test]
    fn closures_are_recorders() {
        let mut agent = Agent::new(Arc::new(|_: &str, _: f32| Ok::<(), String>(())));
        assert_eq!(Outcome::Delivered(1), agent.deliver(&NamedSample::new("x/gauge", 0.5)));
    }
}
