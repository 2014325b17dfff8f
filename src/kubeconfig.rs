//! Kubeconfig loading
//!
//! Resolves the current context of a kubeconfig document into
//! [`ClientOptions`]. Inline base64 certificate data is decoded and written out
//! through a [`FileMaterializer`]. When the cluster carries no certificate
//! authority and its server is reached over `https://`, TLS verification is
//! turned off.

use crate::config::ClientOptions;
use crate::materialize::FileMaterializer;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Encoding of kubeconfig content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KubeconfigFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Context {
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Cluster {
    pub server: Option<String>,
    pub certificate_authority: Option<String>,
    pub certificate_authority_data: Option<String>,
    pub insecure_skip_tls_verify: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct User {
    pub client_certificate: Option<String>,
    pub client_certificate_data: Option<String>,
    pub client_key: Option<String>,
    pub client_key_data: Option<String>,
    pub token: Option<String>,
    #[serde(rename = "tokenFile")]
    pub token_file: Option<String>,
}

/// Parsed kubeconfig document
///
/// Entries of `contexts`, `clusters` and `users` lacking a string `name` or a
/// map body are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kubeconfig {
    pub current_context: Option<Value>,
    pub contexts: BTreeMap<String, Context>,
    pub clusters: BTreeMap<String, Cluster>,
    pub users: BTreeMap<String, User>,
}

impl Kubeconfig {
    pub fn parse(content: &str, format: KubeconfigFormat) -> Result<Self> {
        let value: Value = match format {
            KubeconfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                Error::Parse(format!("Failed to parse YAML encoded KubeConfig: {}", e))
            })?,
            KubeconfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                Error::Parse(format!("Failed to parse JSON encoded KubeConfig: {}", e))
            })?,
        };
        Self::from_value(value)
    }

    /// Read a kubeconfig file; JSON content is accepted as YAML
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Configuration(format!(
                "KubeConfig file does not exist at path: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read KubeConfig {}: {}", path.display(), e))
        })?;
        Self::parse(&content, KubeconfigFormat::Yaml)
    }

    /// Build from an already-parsed document
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(Error::Parse("KubeConfig is not a map.".to_string()));
        };

        Ok(Self {
            current_context: root.remove("current-context"),
            contexts: named_entries(&root, "contexts", "context"),
            clusters: named_entries(&root, "clusters", "cluster"),
            users: named_entries(&root, "users", "user"),
        })
    }

    /// Client options of the current context
    pub fn client_options(&self, materializer: &dyn FileMaterializer) -> Result<ClientOptions> {
        if self.contexts.is_empty() {
            return Err(invalid("No contexts are defined."));
        }
        let current = match &self.current_context {
            None | Some(Value::Null) => return Err(invalid("Missing current context attribute.")),
            Some(Value::String(current)) => current,
            Some(_) => return Err(invalid("The current context is invalid.")),
        };
        let context = self
            .contexts
            .get(current)
            .ok_or_else(|| invalid(&format!("The current context \"{}\" is undefined.", current)))?;

        let cluster_name = context
            .cluster
            .as_deref()
            .ok_or_else(|| invalid("The current context is missing the cluster attribute."))?;
        if self.clusters.is_empty() {
            return Err(invalid("No clusters are defined."));
        }
        let cluster = self
            .clusters
            .get(cluster_name)
            .ok_or_else(|| invalid(&format!("The cluster \"{}\" is undefined.", cluster_name)))?;

        let user_name = context
            .user
            .as_deref()
            .ok_or_else(|| invalid("The current context is missing the user attribute."))?;
        if self.users.is_empty() {
            return Err(invalid("No users are defined."));
        }
        let user = self
            .users
            .get(user_name)
            .ok_or_else(|| invalid(&format!("The user \"{}\" is undefined.", user_name)))?;

        let server = cluster.server.as_deref().ok_or_else(|| {
            invalid(&format!(
                "The cluster \"{}\" is missing the server attribute.",
                cluster_name
            ))
        })?;

        let mut options = ClientOptions::default().with_master(server);
        debug!("KubeConfig context {} targets {}", current, server);

        if let Some(data) = &cluster.certificate_authority_data {
            options.ca_cert = Some(decode_to_file(materializer, "ca-cert.pem", "certificate-authority-data", data)?);
        } else if let Some(path) = &cluster.certificate_authority {
            options.ca_cert = Some(path.clone());
        } else if server.contains("https://") {
            options.verify = Some(false);
        }
        if cluster.insecure_skip_tls_verify == Some(true) {
            options.verify = Some(false);
        }

        if let Some(data) = &user.client_certificate_data {
            options.client_cert = Some(decode_to_file(materializer, "client-cert.pem", "client-certificate-data", data)?);
        } else if let Some(path) = &user.client_certificate {
            options.client_cert = Some(path.clone());
        }
        if let Some(data) = &user.client_key_data {
            options.client_key = Some(decode_to_file(materializer, "client-key.pem", "client-key-data", data)?);
        } else if let Some(path) = &user.client_key {
            options.client_key = Some(path.clone());
        }

        options.token = user.token.clone().or_else(|| user.token_file.clone());
        options.namespace = context.namespace.clone().filter(|ns| !ns.is_empty());

        Ok(options)
    }
}

fn invalid(message: &str) -> Error {
    Error::Configuration(format!("KubeConfig parse error - {}", message))
}

fn named_entries<T: DeserializeOwned>(
    root: &serde_json::Map<String, Value>,
    list: &str,
    body: &str,
) -> BTreeMap<String, T> {
    let Some(Value::Array(entries)) = root.get(list) else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let body = entry.get(body).filter(|b| b.is_object())?;
            let parsed = serde_json::from_value(body.clone()).ok()?;
            Some((name.to_string(), parsed))
        })
        .collect()
}

fn decode_to_file(
    materializer: &dyn FileMaterializer,
    name: &str,
    field: &str,
    data: &str,
) -> Result<String> {
    let content = STANDARD
        .decode(data.trim())
        .map_err(|e| invalid(&format!("The {} attribute is not valid base64: {}", field, e)))?;
    let path = materializer.materialize(name, &content)?;
    Ok(path.to_string_lossy().into_owned())
}
