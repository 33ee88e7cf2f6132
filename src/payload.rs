//! The REST wire format.
//!
//! One `Payload` is built per reporting cycle. It carries a single component
//! whose `metrics` table maps each resolved metric name to its value:
//!
//! ```json
//! {"agent": {"host": "web-1", "pid": 4242, "version": "0.1.0"},
//!  "components": [{"name": "billing", "guid": "com.example.billing",
//!                  "duration": 60,
//!                  "metrics": {"svc.latency/count": 3.0}}]}
//! ```

use libc;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ffi::CStr;
use std::process;
use constants;

/// Identifies the process doing the reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    /// Hostname of the reporting machine.
    pub host: String,
    /// Process id of the reporter.
    pub pid: u32,
    /// Version of the reporting software.
    pub version: String,
}

impl Agent {
    /// Describe the current process.
    pub fn current() -> Agent {
        Agent {
            host: hostname(),
            pid: process::id(),
            version: constants::VERSION.to_string(),
        }
    }
}

/// One provider-side entity and the metrics reported for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    /// Display name of the component.
    pub name: String,
    /// The plugin guid the component reports under.
    pub guid: String,
    /// Seconds of activity the metrics cover.
    pub duration: u64,
    /// Resolved metric name to value.
    pub metrics: BTreeMap<String, f32>,
}

/// A complete request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    /// The reporting process.
    pub agent: Agent,
    /// Always exactly one component.
    pub components: Vec<Component>,
}

/// Accumulates one cycle's named values for a component.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    agent: Agent,
    name: String,
    guid: String,
    duration: u64,
    metrics: BTreeMap<String, f32>,
}

impl PayloadBuilder {
    /// Create an empty builder for the component `name`/`guid`.
    pub fn new(agent: Agent, name: &str, guid: &str, duration: u64) -> PayloadBuilder {
        PayloadBuilder {
            agent: agent,
            name: name.to_string(),
            guid: guid.to_string(),
            duration: duration,
            metrics: BTreeMap::new(),
        }
    }

    /// Add a named value. If `name` is already present the first value is
    /// kept and `false` returned.
    pub fn push(&mut self, name: &str, value: f32) -> bool {
        match self.metrics.entry(name.to_string()) {
            Entry::Vacant(e) => {
                e.insert(value);
                true
            }
            Entry::Occupied(_) => {
                warn!("duplicate metric name {}, keeping first value", name);
                false
            }
        }
    }

    /// Number of values added so far.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Discard any accumulated values.
    pub fn clear(&mut self) {
        self.metrics.clear()
    }

    /// Build the payload, emptying the builder. `None` if nothing was added.
    pub fn build(&mut self) -> Option<Payload> {
        if self.metrics.is_empty() {
            return None;
        }
        let metrics = ::std::mem::replace(&mut self.metrics, BTreeMap::new());
        Some(Payload {
            agent: self.agent.clone(),
            components: vec![
                Component {
                    name: self.name.clone(),
                    guid: self.guid.clone(),
                    duration: self.duration,
                    metrics: metrics,
                },
            ],
        })
    }
}

/// The machine's hostname, or `localhost` if it cannot be determined.
pub fn hostname() -> String {
    let mut buf: [libc::c_char; 256] = [0; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr(), buf.len() - 1) };
    if rc != 0 {
        warn!("unable to determine hostname, using {}", constants::DEFAULT_AGENT_HOST);
        return constants::DEFAULT_AGENT_HOST.to_string();
    }
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned();
    if name.is_empty() {
        constants::DEFAULT_AGENT_HOST.to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json;

    fn agent() -> Agent {
        Agent {
            host: "web-1".into(),
            pid: 4242,
            version: "0.1.0".into(),
        }
    }

    #[test]
    fn empty_builder_builds_nothing() {
        let mut builder = PayloadBuilder::new(agent(), "billing", "com.example.billing", 60);
        assert!(builder.is_empty());
        assert_eq!(None, builder.build());
    }

    #[test]
    fn first_value_wins() {
        let mut builder = PayloadBuilder::new(agent(), "billing", "com.example.billing", 60);
        assert!(builder.push("a/b/count", 1.0));
        assert!(!builder.push("a/b/count", 2.0));
        assert_eq!(1, builder.len());
        let payload = builder.build().unwrap();
        assert_eq!(Some(&1.0), payload.components[0].metrics.get("a/b/count"));
    }

    #[test]
    fn build_drains() {
        let mut builder = PayloadBuilder::new(agent(), "billing", "com.example.billing", 60);
        builder.push("jobs/count", 5.0);
        assert!(builder.build().is_some());
        assert!(builder.is_empty());
        assert_eq!(None, builder.build());
    }

    #[test]
    fn wire_shape() {
        let mut builder = PayloadBuilder::new(agent(), "billing", "com.example.billing", 60);
        builder.push("jobs/count", 5.0);
        let payload = builder.build().unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json!({
                "agent": {"host": "web-1", "pid": 4242, "version": "0.1.0"},
                "components": [{
                    "name": "billing",
                    "guid": "com.example.billing",
                    "duration": 60,
                    "metrics": {"jobs/count": 5.0}
                }]
            }),
            json
        );
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }
}
