//! Reporter configuration.
//!
//! A reporter is assembled from a `Properties` bag: the registry to read and,
//! optionally, a programmatic filter, plus string-valued settings under the
//! keys below. Properties may be filled in by hand or read from a TOML file
//! whose top-level keys are the same names:
//!
//! ```toml
//! license-key = "0123456789abcdef"
//! component-name = "billing"
//! app-id = "com.example.billing"
//! duration = 60
//! prefix = "Production"
//! rate-unit = "seconds"
//! duration-unit = "milliseconds"
//! metric-filter = "^svc\\."
//! ```
//!
//! The factory functions at the bottom of this module validate the bag and
//! return a ready `Reporter`, or a `ConfigError` naming every mandatory key
//! that is missing.

use clap::{App, Arg};
use constants;
use extract::Units;
use metric::Metric;
use registry::{AllMetrics, MetricFilter, RegexFilter, Registry};
use reporter::{Reporter, ReporterConfig};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time::TimeUnit;
use toml;
use transport::{Agent, Console, MetricRecorder, Rest, RestConfig};
use url::Url;

/// Name of the registry, which can only be set programmatically. Reported
/// when missing.
pub const REGISTRY: &str = "registry";
/// Credential sent with every REST request.
pub const LICENSE_KEY: &str = "license-key";
/// Name of the reported component.
pub const COMPONENT_NAME: &str = "component-name";
/// Guid the component reports under.
pub const APP_ID: &str = "app-id";
/// Seconds of activity a payload covers, and the binary's reporting period.
pub const DURATION: &str = "duration";
/// Prepended to every metric name.
pub const PREFIX: &str = "prefix";
/// Unit rates are reported in.
pub const RATE_UNIT: &str = "rate-unit";
/// Unit timer durations are reported in.
pub const DURATION_UNIT: &str = "duration-unit";
/// Regular expression a metric name must match to be reported.
pub const METRIC_FILTER: &str = "metric-filter";
/// REST endpoint.
pub const ENDPOINT: &str = "endpoint";
/// REST request timeout, seconds.
pub const TIMEOUT: &str = "timeout";

/// Why a reporter could not be built.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// These mandatory keys have no value.
    Missing(Vec<String>),
    /// A key has a value that cannot be used.
    Invalid {
        /// The offending key
        key: String,
        /// Its value
        value: String,
        /// What is wrong with it
        reason: String,
    },
    /// The configuration file could not be read.
    Io(String),
    /// The configuration file is not valid TOML.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Missing(ref keys) => {
                write!(f, "missing mandatory configuration: {}", keys.join(", "))
            }
            ConfigError::Invalid {
                ref key,
                ref value,
                ref reason,
            } => write!(f, "invalid value '{}' for {}: {}", value, key, reason),
            ConfigError::Io(ref e) => write!(f, "could not read configuration: {}", e),
            ConfigError::Parse(ref e) => write!(f, "could not parse configuration: {}", e),
        }
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// The raw settings a reporter is built from.
#[derive(Clone, Default)]
pub struct Properties {
    registry: Option<Arc<dyn Registry>>,
    filter: Option<Arc<dyn MetricFilter>>,
    values: BTreeMap<String, String>,
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Properties")
            .field("registry", &self.registry.is_some())
            .field("filter", &self.filter.is_some())
            .field("values", &self.values)
            .finish()
    }
}

impl Properties {
    /// Create an empty bag.
    pub fn new() -> Properties {
        Properties::default()
    }

    /// Read a bag from the top-level keys of a TOML document. Strings are
    /// taken as-is, numbers and booleans are stringified.
    pub fn from_toml(buffer: &str) -> Result<Properties, ConfigError> {
        let value: toml::Value =
            toml::from_str(buffer).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let table = match value.as_table() {
            Some(t) => t,
            None => return Err(ConfigError::Parse("expected a table".into())),
        };
        let mut props = Properties::new();
        for (key, value) in table {
            let s = match *value {
                toml::Value::String(ref s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                ref other => {
                    return Err(invalid(key, &other.to_string(), "expected a string or number"))
                }
            };
            props.set(key.as_str(), s);
        }
        Ok(props)
    }

    /// Read a bag from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Properties, ConfigError> {
        let path = path.as_ref();
        let mut buffer = String::new();
        File::open(path)
            .and_then(|mut fp| fp.read_to_string(&mut buffer))
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Properties::from_toml(&buffer)
    }

    /// Set the registry to report on.
    pub fn registry(mut self, registry: Arc<dyn Registry>) -> Properties {
        self.registry = Some(registry);
        self
    }

    /// Set a programmatic filter. It applies in addition to any
    /// `metric-filter` expression.
    pub fn filter(mut self, filter: Arc<dyn MetricFilter>) -> Properties {
        self.filter = Some(filter);
        self
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set<K, V>(&mut self, key: K, value: V) -> &mut Properties
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Builder form of `set`.
    pub fn with<K, V>(mut self, key: K, value: V) -> Properties
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    /// The value of `key`. Blank values read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    fn unit(&self, key: &str, default: TimeUnit) -> Result<TimeUnit, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(s) => s.parse().map_err(|e: String| invalid(key, s, &e)),
        }
    }

    fn seconds(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(s) => match s.parse::<u64>() {
                Ok(0) => Err(invalid(key, s, "must be greater than zero")),
                Ok(n) => Ok(n),
                Err(e) => Err(invalid(key, s, &e.to_string())),
            },
        }
    }

    /// The `duration` setting, in seconds.
    pub fn duration(&self) -> Result<u64, ConfigError> {
        self.seconds(DURATION, constants::DEFAULT_DURATION)
    }

    fn require(&self, keys: &[&str]) -> Result<(), ConfigError> {
        let mut missing: Vec<String> = Vec::new();
        if self.registry.is_none() {
            missing.push(REGISTRY.to_string());
        }
        missing.extend(
            keys.iter()
                .filter(|k| self.get(k).is_none())
                .map(|k| k.to_string()),
        );
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// The settings common to every reporter.
    pub fn reporter_config(&self) -> Result<ReporterConfig, ConfigError> {
        self.require(&[])?;
        let registry = match self.registry {
            Some(ref r) => r.clone(),
            None => return Err(ConfigError::Missing(vec![REGISTRY.to_string()])),
        };
        let units = Units {
            rate: self.unit(RATE_UNIT, TimeUnit::Seconds)?,
            duration: self.unit(DURATION_UNIT, TimeUnit::Milliseconds)?,
        };
        let regex = match self.get(METRIC_FILTER) {
            None => None,
            Some(s) => Some(RegexFilter::new(s).map_err(|e| invalid(METRIC_FILTER, s, &e))?),
        };
        let filter: Arc<dyn MetricFilter> = match (regex, self.filter.clone()) {
            (None, None) => Arc::new(AllMetrics),
            (Some(re), None) => Arc::new(re),
            (None, Some(f)) => f,
            (Some(re), Some(f)) => {
                Arc::new(move |name: &str, metric: &Metric| re.matches(name, metric) && f.matches(name, metric))
            }
        };
        Ok(ReporterConfig {
            registry: registry,
            prefix: self.get(PREFIX).map(|s| s.to_string()),
            units: units,
            filter: filter,
        })
    }

    /// The REST transport settings.
    pub fn rest_config(&self) -> Result<RestConfig, ConfigError> {
        self.require(&[LICENSE_KEY, COMPONENT_NAME, APP_ID])?;
        let endpoint = self.get(ENDPOINT).unwrap_or(constants::DEFAULT_URL);
        let url = Url::parse(endpoint).map_err(|e| invalid(ENDPOINT, endpoint, &e.to_string()))?;
        match url.scheme() {
            "http" => {}
            "https" => {
                return Err(invalid(
                    ENDPOINT,
                    endpoint,
                    "https is not supported, use an http endpoint",
                ))
            }
            other => {
                return Err(invalid(
                    ENDPOINT,
                    endpoint,
                    &format!("unsupported scheme {}", other),
                ))
            }
        }
        // require() has already checked these
        let get = |key: &str| self.get(key).unwrap_or_default().to_string();
        Ok(RestConfig {
            endpoint: url,
            license_key: get(LICENSE_KEY),
            component_name: get(COMPONENT_NAME),
            app_id: get(APP_ID),
            duration: self.duration()?,
            timeout: Duration::from_secs(self.seconds(TIMEOUT, constants::DEFAULT_TIMEOUT)?),
        })
    }
}

/// Build a reporter POSTing JSON payloads to the REST endpoint.
///
/// Mandatory: the registry, `license-key`, `component-name` and `app-id`.
pub fn rest_reporter(props: &Properties) -> Result<Reporter<Rest>, ConfigError> {
    let rest = props.rest_config()?;
    let config = props.reporter_config()?;
    Ok(Reporter::new(config, Rest::new(rest)))
}

/// Build a reporter handing each value to an in-process agent.
///
/// Mandatory: the registry.
pub fn agent_reporter(
    props: &Properties,
    recorder: Arc<dyn MetricRecorder>,
) -> Result<Reporter<Agent>, ConfigError> {
    let config = props.reporter_config()?;
    Ok(Reporter::new(config, Agent::new(recorder)))
}

/// Build a reporter printing to stdout.
///
/// Mandatory: the registry.
pub fn console_reporter(props: &Properties) -> Result<Reporter<Console>, ConfigError> {
    let config = props.reporter_config()?;
    Ok(Reporter::new(config, Console::default()))
}

/// Command line arguments of the `relic` executable.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// Path to the TOML configuration file.
    pub config_file: PathBuf,
    /// The higher the value the more chatty the logs.
    pub verbose: u64,
    /// Print to stdout rather than POSTing to the endpoint.
    pub console: bool,
}

/// Parse the process's command line.
pub fn parse_args() -> Args {
    args_from(::std::env::args_os())
}

/// Parse `itr` as a command line, first element being the program name.
/// Exits the process on bad arguments or `--help`.
pub fn args_from<I, T>(itr: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = App::new("relic")
        .version(constants::VERSION)
        .about("periodic metric reporting to a plugin ingestion endpoint")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("console")
                .long("console")
                .help("Print metrics instead of sending them."),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches_from(itr);

    Args {
        config_file: PathBuf::from(args.value_of("config-file").unwrap_or_default()),
        verbose: args.occurrences_of("verbose"),
        console: args.is_present("console"),
    }
}
