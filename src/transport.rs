//! HTTP transport contract and transport selection
//!
//! The client never talks to the network directly. Requests are handed to a
//! [`Transport`], built on demand by the first available [`TransportFactory`]
//! registered with a [`TransportSelector`]. The default selector knows a single
//! factory backed by `reqwest`'s blocking client.

use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("kube-repository-client/", env!("CARGO_PKG_VERSION"));

/// Request handed to a transport
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Response returned by a transport; the body is a live stream
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Box<dyn Read + Send>,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    /// Response with an in-memory body and no headers
    pub fn from_bytes(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, HeaderMap::new(), std::io::Cursor::new(body.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_mut(&mut self) -> &mut (dyn Read + Send) {
        self.body.as_mut()
    }

    pub fn into_body(self) -> Box<dyn Read + Send> {
        self.body
    }

    /// Drain the body into a string
    pub fn text(mut self) -> Result<String> {
        let mut raw = Vec::new();
        self.body.read_to_end(&mut raw).map_err(|e| Error::Transport {
            code: self.status.as_u16(),
            message: format!("Failed to read response body: {}", e),
        })?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Failure of the transport itself
#[derive(Debug, Error)]
pub enum TransferError {
    /// No response was produced (connection refused, DNS, TLS...)
    #[error("{0}")]
    Network(String),
    /// The transfer failed but a response was attached
    #[error("transfer failed with status {status}")]
    Http { status: u16, body: String },
}

impl From<TransferError> for Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Network(message) => Error::Transport { code: 500, message },
            TransferError::Http { status, body } => Error::Transport {
                code: status,
                message: body,
            },
        }
    }
}

/// Sends a request and hands back the raw response
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> std::result::Result<Response, TransferError>;
}

/// TLS and timeout settings a transport is built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub verify: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            verify: true,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            timeout: None,
        }
    }
}

/// Builds transports of one implementation
pub trait TransportFactory: Send + Sync {
    /// Name used to select this factory explicitly
    fn name(&self) -> &str;

    /// Whether the implementation can be used in this process
    fn is_available(&self) -> bool {
        true
    }

    fn build(&self, options: &TransportOptions) -> Result<Arc<dyn Transport>>;
}

/// Ordered set of transport factories
#[derive(Clone)]
pub struct TransportSelector {
    factories: Vec<Arc<dyn TransportFactory>>,
}

impl TransportSelector {
    /// Selector knowing the reqwest-backed factory
    pub fn new() -> Self {
        Self {
            factories: vec![Arc::new(ReqwestFactory)],
        }
    }

    /// Selector without any factory
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Register a factory, replacing any factory with the same name
    pub fn register(&mut self, factory: Arc<dyn TransportFactory>) -> &mut Self {
        match self.factories.iter().position(|f| f.name() == factory.name()) {
            Some(index) => self.factories[index] = factory,
            None => self.factories.push(factory),
        }
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Build a transport with the first available factory
    pub fn select(&self, options: &TransportOptions) -> Result<Arc<dyn Transport>> {
        let factory = self
            .factories
            .iter()
            .find(|f| f.is_available())
            .ok_or_else(|| {
                Error::Configuration(
                    "No HTTP transport found. Register a transport factory or inject a transport"
                        .to_string(),
                )
            })?;

        debug!("Selected transport {}", factory.name());
        factory.build(options)
    }

    /// Build a transport with the factory registered under `name`
    pub fn select_named(&self, name: &str, options: &TransportOptions) -> Result<Arc<dyn Transport>> {
        let factory = self
            .factories
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::Configuration(format!("Unknown HTTP transport: {}", name)))?;

        if !factory.is_available() {
            return Err(Error::Configuration(format!(
                "HTTP transport {} is not available",
                name
            )));
        }
        factory.build(options)
    }
}

impl Default for TransportSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSelector")
            .field("factories", &self.names())
            .finish()
    }
}

/// Factory for [`ReqwestTransport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestFactory;

impl TransportFactory for ReqwestFactory {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn build(&self, options: &TransportOptions) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(ReqwestTransport::new(options)?))
    }
}

/// Transport backed by `reqwest::blocking::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!options.verify)
            .timeout(options.timeout);

        if let Some(ca_cert) = &options.ca_cert {
            let pem = read_pem(ca_cert)?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                Error::Configuration(format!("Invalid CA certificate {}: {}", ca_cert.display(), e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(client_cert) = &options.client_cert {
            let mut pem = read_pem(client_cert)?;
            if let Some(client_key) = &options.client_key {
                pem.push(b'\n');
                pem.extend(read_pem(client_key)?);
            }
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                Error::Configuration(format!(
                    "Invalid client certificate {}: {}",
                    client_cert.display(),
                    e
                ))
            })?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: Request) -> std::result::Result<Response, TransferError> {
        let mut builder = self
            .client
            .request(request.method, &request.uri)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        match builder.send() {
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                Ok(Response::new(status, headers, response))
            }
            Err(e) => Err(match e.status() {
                Some(status) => TransferError::Http {
                    status: status.as_u16(),
                    body: e.to_string(),
                },
                None => TransferError::Network(e.to_string()),
            }),
        }
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(|e| Error::Configuration(format!("Failed to read {}: {}", path.display(), e)))
}
