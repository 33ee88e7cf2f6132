//! Library level constants
use mio;

/// MIO token used to signal a reporting thread to shut down.
pub const SYSTEM: mio::Token = mio::Token(2048);

/// Where REST payloads go unless configured otherwise.
pub const DEFAULT_URL: &str = "http://platform-api.newrelic.com/platform/v1/metrics";

/// Reported as the agent host when the hostname cannot be determined.
pub const DEFAULT_AGENT_HOST: &str = "localhost";

/// Reported as the agent version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds of activity a payload covers unless configured otherwise.
pub const DEFAULT_DURATION: u64 = 60;

/// REST request read and write timeout, in seconds, unless configured
/// otherwise.
pub const DEFAULT_TIMEOUT: u64 = 10;
