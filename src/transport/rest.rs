use hyper;
use hyper::client::Client;
use hyper::header::{qitem, Accept, ContentType, Headers};
use hyper::mime::{Mime, SubLevel, TopLevel};
use hyper::net::{HttpStream, NetworkConnector};
use payload::{self, Payload, PayloadBuilder};
use serde_json;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use super::{NamedSample, Outcome, Transport, TransportError};
use url::Url;

/// Name of the header carrying the account credential.
pub const LICENSE_HEADER: &str = "X-License-Key";

/// Settings for the REST transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RestConfig {
    /// Where payloads are POSTed.
    pub endpoint: Url,
    /// Sent as the `X-License-Key` header.
    pub license_key: String,
    /// Name of the reported component.
    pub component_name: String,
    /// Guid the component reports under.
    pub app_id: String,
    /// Seconds of activity each payload covers.
    pub duration: u64,
    /// Bound on connecting, writing and reading each request.
    pub timeout: Duration,
}

/// Plain TCP connector whose connect attempts give up after `timeout`.
struct TimeoutConnector {
    timeout: Duration,
}

impl NetworkConnector for TimeoutConnector {
    type Stream = HttpStream;

    fn connect(&self, host: &str, port: u16, scheme: &str) -> hyper::Result<HttpStream> {
        if scheme != "http" {
            return Err(hyper::Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported scheme {}", scheme),
            )));
        }
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(HttpStream(stream)),
                Err(e) => {
                    debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(hyper::Error::Io(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", host),
            )
        })))
    }
}

/// Batches a cycle's samples into one JSON payload and POSTs it on flush.
pub struct Rest {
    config: RestConfig,
    client: Client,
    builder: PayloadBuilder,
}

impl Rest {
    /// Create a new `Rest` transport.
    pub fn new(config: RestConfig) -> Rest {
        let mut client = Client::with_connector(TimeoutConnector {
            timeout: config.timeout,
        });
        client.set_read_timeout(Some(config.timeout));
        client.set_write_timeout(Some(config.timeout));
        let builder = PayloadBuilder::new(
            payload::Agent::current(),
            &config.component_name,
            &config.app_id,
            config.duration,
        );
        Rest {
            config: config,
            client: client,
            builder: builder,
        }
    }

    /// The settings this transport was built with.
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.set(Accept(vec![
            qitem(Mime(TopLevel::Application, SubLevel::Json, vec![])),
        ]));
        headers.set(ContentType::json());
        headers.set_raw(LICENSE_HEADER, vec![self.config.license_key.as_bytes().to_vec()]);
        headers
    }

    fn post(&self, payload: &Payload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        trace!("POST {} {}", self.config.endpoint, body);
        let mut resp = self.client
            .post(self.config.endpoint.as_str())
            .headers(self.headers())
            .body(body.as_str())
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let mut answer = String::new();
        if let Err(e) = resp.read_to_string(&mut answer) {
            debug!("unable to read response body: {}", e);
        }
        if resp.status.is_success() {
            debug!("endpoint answered {}: {}", resp.status, answer);
            Ok(())
        } else {
            Err(TransportError::Status(resp.status.to_u16()))
        }
    }
}

impl Transport for Rest {
    fn deliver(&mut self, sample: &NamedSample) -> Outcome {
        self.builder.push(&sample.name, sample.value);
        Outcome::Skipped
    }

    fn flush(&mut self) -> Outcome {
        let payload = match self.builder.build() {
            Some(p) => p,
            None => return Outcome::Skipped,
        };
        let total: usize = payload.components.iter().map(|c| c.metrics.len()).sum();
        match self.post(&payload) {
            Ok(()) => Outcome::Delivered(total),
            Err(e) => Outcome::Failed(e),
        }
    }
}
