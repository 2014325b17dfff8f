//! Client options and the merge rules applied by `Client::configure`

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Namespace used when none has been configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Options recognized by the client
///
/// Every field is optional so that a partial set of options can be merged onto
/// the current configuration. Field names match the keys of the options map
/// (`master`, `token`, `namespace`, `verify`, `ca_cert`, `client_cert`,
/// `client_key`, `timeout`); other keys are ignored.
///
/// # Example
///
/// ```
/// use kube_repository_client::ClientOptions;
///
/// let options = ClientOptions::default()
///     .with_master("https://k8s.example.com")
///     .with_namespace("staging");
/// assert_eq!(options.master.as_deref(), Some("https://k8s.example.com"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Base URL of the API server (mandatory once merged)
    pub master: Option<String>,
    /// Bearer token, or path to a file holding it
    pub token: Option<String>,
    pub namespace: Option<String>,
    /// Verify the server TLS certificate
    pub verify: Option<bool>,
    /// CA certificate: an existing file path or inline PEM content
    pub ca_cert: Option<String>,
    /// Client certificate: an existing file path or inline PEM content
    pub client_cert: Option<String>,
    /// Client key: an existing file path or inline PEM content
    pub client_key: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl ClientOptions {
    /// Build options from an already-parsed map
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("Failed to parse client options: {}", e)))
    }

    pub fn with_master(mut self, master: impl Into<String>) -> Self {
        self.master = Some(master.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = Some(verify);
        self
    }

    pub fn with_ca_cert(mut self, ca_cert: impl Into<String>) -> Self {
        self.ca_cert = Some(ca_cert.into());
        self
    }

    pub fn with_client_cert(mut self, client_cert: impl Into<String>) -> Self {
        self.client_cert = Some(client_cert.into());
        self
    }

    pub fn with_client_key(mut self, client_key: impl Into<String>) -> Self {
        self.client_key = Some(client_key.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Options set in `other` take precedence over these
    pub fn overlay(self, other: &ClientOptions) -> Self {
        let other = other.clone();
        Self {
            master: other.master.or(self.master),
            token: other.token.or(self.token),
            namespace: other.namespace.or(self.namespace),
            verify: other.verify.or(self.verify),
            ca_cert: other.ca_cert.or(self.ca_cert),
            client_cert: other.client_cert.or(self.client_cert),
            client_key: other.client_key.or(self.client_key),
            timeout: other.timeout.or(self.timeout),
        }
    }
}

/// Fully resolved client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub master: String,
    pub token: Option<String>,
    pub namespace: String,
    pub verify: bool,
    pub ca_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master: String::new(),
            token: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            verify: true,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            timeout: None,
        }
    }
}

impl Settings {
    /// Merge `options` onto these settings, or onto defaults when `reset` is set
    ///
    /// Fails when no master URL is left after merging; `self` is not modified.
    pub fn merged(&self, options: &ClientOptions, reset: bool) -> Result<Self> {
        let mut next = if reset { Settings::default() } else { self.clone() };

        if let Some(master) = &options.master {
            next.master = master.clone();
        }
        if let Some(token) = &options.token {
            next.token = Some(token.clone());
        }
        if let Some(ca_cert) = &options.ca_cert {
            next.ca_cert = Some(ca_cert.clone());
        }
        if let Some(client_cert) = &options.client_cert {
            next.client_cert = Some(client_cert.clone());
        }
        if let Some(client_key) = &options.client_key {
            next.client_key = Some(client_key.clone());
        }
        if let Some(timeout) = options.timeout {
            next.timeout = Some(Duration::from_secs(timeout));
        }
        if let Some(namespace) = &options.namespace {
            next.namespace = namespace.clone();
        }
        if let Some(verify) = options.verify {
            next.verify = verify;
        }

        if next.master.trim().is_empty() {
            return Err(Error::Configuration(
                "Error, master option is mandatory for this client".to_string(),
            ));
        }

        Ok(next)
    }
}
