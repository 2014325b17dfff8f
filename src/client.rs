//! Authenticated gateway to the API server
//!
//! Every repository funnels its requests through a [`Client`]: the client
//! builds the request URI, attaches the content type and bearer token, hands
//! the request to its transport and turns error statuses into [`Error`]s.

use crate::config::{ClientOptions, Settings};
use crate::error::cap_body;
use crate::kubeconfig::Kubeconfig;
use crate::materialize::{materialize_if_inline, FileMaterializer, TempDirMaterializer};
use crate::model::Kind;
use crate::registry::{RepositoryEntry, RepositoryRegistry, SharedRepository};
use crate::repository::Repository;
use crate::transport::{Request, Response, Transport, TransportOptions, TransportSelector};
use crate::{Error, Result};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use phf::phf_set;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace, warn};

/// Query parameters of a request, encoded in key order
pub type Query = BTreeMap<String, String>;

/// Paths served directly under the master URL
static UNPREFIXED_PATHS: phf::Set<&'static str> = phf_set! {
    "/healthz",
    "/version",
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Semantics of a PATCH body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatchType {
    /// RFC 6902 JSON patch
    Json,
    /// RFC 7386 JSON merge patch
    Merge,
    #[default]
    Strategic,
}

impl PatchType {
    pub fn content_type(&self) -> &'static str {
        match self {
            PatchType::Json => "application/json-patch+json",
            PatchType::Merge => "application/merge-patch+json",
            PatchType::Strategic => "application/strategic-merge-patch+json",
        }
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Raw(String),
}

impl Body {
    fn into_bytes(self) -> Result<Bytes> {
        match self {
            Body::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
            Body::Raw(raw) => Ok(Bytes::from(raw)),
        }
    }
}

/// Description of one API call, resolved into a URI by the client
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Query,
    body: Option<Body>,
    namespaced: bool,
    api_version: Option<String>,
    patch_type: Option<PatchType>,
}

impl ApiRequest {
    /// Namespaced request against the core `api/v1` base
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            body: None,
            namespaced: true,
            api_version: None,
            patch_type: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(body.into()));
        self
    }

    pub fn with_namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Serve from `apis/<api_version>`; `None` keeps the core base
    pub fn with_api_version(mut self, api_version: Option<&str>) -> Self {
        self.api_version = api_version.map(str::to_string);
        self
    }

    /// Patch type for this request only
    pub fn with_patch_type(mut self, patch_type: PatchType) -> Self {
        self.patch_type = Some(patch_type);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

pub(crate) struct ClientInner {
    settings: RwLock<Settings>,
    patch_type: RwLock<PatchType>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    injected_transport: Option<Arc<dyn Transport>>,
    selector: TransportSelector,
    materializer: Arc<dyn FileMaterializer>,
    registry: RwLock<RepositoryRegistry>,
    repositories: Mutex<HashMap<String, SharedRepository>>,
    // Inline certificate material already written out, by file name and content
    materialized: Mutex<HashMap<(&'static str, String), PathBuf>>,
}

/// Synchronous client for a Kubernetes-style API
///
/// Cloning is cheap and clones share configuration, transport and
/// repositories. Each client built through [`ClientBuilder`] has its own
/// registry and its own memoized repositories.
///
/// # Example
///
/// ```no_run
/// use kube_repository_client::{Client, ClientOptions, LabelSelector, Query};
///
/// let client = Client::new(
///     ClientOptions::default()
///         .with_master("https://k8s.example.com")
///         .with_token("/var/run/secrets/kubernetes.io/serviceaccount/token"),
/// )?;
///
/// let pods = client.pods()?;
/// let running = pods
///     .set_label_selector(LabelSelector::new().eq("app", "web"))
///     .find(Query::new())?;
/// for pod in &running {
///     println!("{:?}", pod.name());
/// }
/// # Ok::<(), kube_repository_client::Error>(())
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Client with the default transport, registry and materializer
    pub fn new(options: ClientOptions) -> Result<Self> {
        ClientBuilder::new().with_options(options).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client configured from kubeconfig content
    pub fn from_kubeconfig(kubeconfig: &Kubeconfig) -> Result<Self> {
        ClientBuilder::new().with_kubeconfig(kubeconfig.clone()).build()
    }

    /// Client configured from a kubeconfig file, YAML or JSON
    pub fn from_kubeconfig_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_kubeconfig(&Kubeconfig::read(path)?)
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Merge `options` onto the current configuration
    ///
    /// With `reset`, earlier options are discarded first. Nothing changes when
    /// the merged configuration lacks a master URL.
    pub fn configure(&self, options: &ClientOptions, reset: bool) -> Result<()> {
        let mut settings = self.inner.settings.write().expect("settings lock poisoned");
        *settings = settings.merged(options, reset)?;
        drop(settings);

        self.inner
            .transport
            .write()
            .expect("transport lock poisoned")
            .take();
        debug!("Client reconfigured (reset: {})", reset);
        Ok(())
    }

    /// Snapshot of the current configuration
    pub fn settings(&self) -> Settings {
        self.inner
            .settings
            .read()
            .expect("settings lock poisoned")
            .clone()
    }

    pub fn namespace(&self) -> String {
        self.inner
            .settings
            .read()
            .expect("settings lock poisoned")
            .namespace
            .clone()
    }

    pub fn set_namespace(&self, namespace: impl Into<String>) -> &Self {
        self.inner
            .settings
            .write()
            .expect("settings lock poisoned")
            .namespace = namespace.into();
        self
    }

    pub fn patch_type(&self) -> PatchType {
        *self.inner.patch_type.read().expect("patch type lock poisoned")
    }

    pub fn set_patch_type(&self, patch_type: PatchType) -> &Self {
        *self.inner.patch_type.write().expect("patch type lock poisoned") = patch_type;
        self
    }

    /// Full URI of `path`
    ///
    /// The base is `apis/<api_version>` when an API version is given and
    /// `api/v1` otherwise, followed by `/namespaces/<namespace>` when
    /// `use_namespace` is set. `/healthz` and `/version` hang directly off the
    /// master URL.
    pub fn build_uri(
        &self,
        path: &str,
        query: &Query,
        use_namespace: bool,
        api_version: Option<&str>,
    ) -> String {
        let settings = self.inner.settings.read().expect("settings lock poisoned");
        let master = settings.master.trim_end_matches('/');

        let mut uri = if UNPREFIXED_PATHS.contains(path) {
            format!("{}{}", master, path)
        } else {
            let mut base = match api_version.filter(|v| !v.is_empty()) {
                Some(api_version) => format!("apis/{}", api_version),
                None => "api/v1".to_string(),
            };
            if use_namespace {
                base.push_str("/namespaces/");
                base.push_str(&settings.namespace);
            }
            format!("{}/{}{}", master, base, path)
        };

        if !query.is_empty() {
            uri.push('?');
            uri.push_str(&encode_query(query));
        }
        uri
    }

    /// Send `request` and return the raw response
    ///
    /// Statuses of 400 and above become [`Error::ApiServer`]; transfer
    /// failures become [`Error::Transport`].
    pub fn dispatch(&self, request: ApiRequest) -> Result<Response> {
        let ApiRequest {
            method,
            path,
            query,
            body,
            namespaced,
            api_version,
            patch_type,
        } = request;

        let uri = self.build_uri(&path, &query, namespaced, api_version.as_deref());
        let headers = self.headers(&method, patch_type)?;
        let body = body.map(Body::into_bytes).transpose()?;
        let transport = self.transport()?;

        debug!("{} {}", method, uri);
        trace!("Request headers: {:?}", headers.keys().collect::<Vec<_>>());

        let response = transport.send(Request {
            method: method.clone(),
            uri: uri.clone(),
            headers,
            body,
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().unwrap_or_default();
            warn!("{} {} answered {}: {}", method, uri, status, sanitize(cap_body(&body)));
            return Err(Error::api(status, &body));
        }

        Ok(response)
    }

    /// Send `request` and decode the JSON answer; an empty body decodes to `null`
    pub fn send_json(&self, request: ApiRequest) -> Result<Value> {
        let body = self.dispatch(request)?.text()?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Failed to decode API response: {}", e)))
    }

    pub fn send_text(&self, request: ApiRequest) -> Result<String> {
        self.dispatch(request)?.text()
    }

    /// Send `request` and hand back the live response for the caller to read
    pub fn send_stream(&self, request: ApiRequest) -> Result<Response> {
        self.dispatch(request)
    }

    pub fn health(&self) -> Result<String> {
        self.send_text(ApiRequest::get("/healthz"))
    }

    pub fn version(&self) -> Result<Value> {
        self.send_json(ApiRequest::get("/version"))
    }

    /// Repository registered as `name`, serving models of kind `K`
    ///
    /// Repositories are built on first use and memoized per client.
    pub fn repository<K: Kind>(&self, name: &str) -> Result<Arc<Repository<K>>> {
        let mut repositories = self
            .inner
            .repositories
            .lock()
            .expect("repositories lock poisoned");
        if let Some(shared) = repositories.get(name) {
            return downcast_repository::<K>(name, shared.clone());
        }

        let registry = self.inner.registry.read().expect("registry lock poisoned");
        let entry = registry
            .get(name)
            .ok_or_else(|| Error::NoSuchRepository(name.to_string()))?;
        if !entry.is_for::<K>() {
            return Err(Error::Logic(format!(
                "Error, repository {} serves {}, not {}",
                name,
                entry.type_name(),
                std::any::type_name::<K>()
            )));
        }

        let shared = entry.build(Arc::downgrade(&self.inner));
        debug!("Built repository {} for /{}", name, entry.resource());
        repositories.insert(name.to_string(), shared.clone());
        downcast_repository::<K>(name, shared)
    }

    /// Register or override a repository on this client
    pub fn register_repository(&self, name: &str, entry: RepositoryEntry) -> Result<()> {
        self.inner
            .registry
            .write()
            .expect("registry lock poisoned")
            .insert(name, entry)?;
        self.forget_repository(name);
        Ok(())
    }

    pub fn unregister_repository(&self, name: &str) -> bool {
        let removed = self
            .inner
            .registry
            .write()
            .expect("registry lock poisoned")
            .remove(name)
            .is_some();
        self.forget_repository(name);
        removed
    }

    pub fn has_repository(&self, name: &str) -> bool {
        self.inner
            .registry
            .read()
            .expect("registry lock poisoned")
            .contains(name)
    }

    pub fn repository_names(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .expect("registry lock poisoned")
            .names()
            .map(str::to_string)
            .collect()
    }

    fn forget_repository(&self, name: &str) {
        self.inner
            .repositories
            .lock()
            .expect("repositories lock poisoned")
            .remove(name);
    }

    fn headers(&self, method: &Method, patch_type: Option<PatchType>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if *method == Method::PATCH {
            let patch_type = patch_type.unwrap_or_else(|| self.patch_type());
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(patch_type.content_type()));
        } else if *method == Method::POST || *method == Method::PUT {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        let token = self.settings().token;
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let token = resolve_token(&token)?;
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Configuration(format!("Error, invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        if let Some(transport) = &self.inner.injected_transport {
            return Ok(transport.clone());
        }
        if let Some(transport) = self
            .inner
            .transport
            .read()
            .expect("transport lock poisoned")
            .as_ref()
        {
            return Ok(transport.clone());
        }

        let settings = self.settings();
        let options = TransportOptions {
            verify: settings.verify,
            ca_cert: settings
                .ca_cert
                .as_deref()
                .map(|v| self.certificate_path("ca-cert.pem", v))
                .transpose()?,
            client_cert: settings
                .client_cert
                .as_deref()
                .map(|v| self.certificate_path("client-cert.pem", v))
                .transpose()?,
            client_key: settings
                .client_key
                .as_deref()
                .map(|v| self.certificate_path("client-key.pem", v))
                .transpose()?,
            timeout: settings.timeout,
        };

        let transport = self.inner.selector.select(&options)?;
        *self.inner.transport.write().expect("transport lock poisoned") = Some(transport.clone());
        Ok(transport)
    }

    /// Path of a certificate setting, writing inline content out at most once per client
    fn certificate_path(&self, name: &'static str, value: &str) -> Result<PathBuf> {
        let mut materialized = self
            .inner
            .materialized
            .lock()
            .expect("materialized lock poisoned");
        let key = (name, value.to_string());
        if let Some(path) = materialized.get(&key) {
            return Ok(path.clone());
        }

        let path = materialize_if_inline(self.inner.materializer.as_ref(), name, value)?;
        materialized.insert(key, path.clone());
        Ok(path)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.settings();
        f.debug_struct("Client")
            .field("master", &settings.master)
            .field("namespace", &settings.namespace)
            .field("patch_type", &self.patch_type())
            .finish()
    }
}

fn downcast_repository<K: Kind>(name: &str, shared: SharedRepository) -> Result<Arc<Repository<K>>> {
    shared.downcast::<Repository<K>>().map_err(|_| {
        Error::Logic(format!(
            "Error, repository {} does not serve {}",
            name,
            std::any::type_name::<K>()
        ))
    })
}

/// Resolve a configured token, reading it from disk when it names a file
///
/// Tokens that look like URLs are rejected before anything is read, and so
/// are tokens spanning several lines.
fn resolve_token(configured: &str) -> Result<String> {
    if url::Url::parse(configured).is_ok() {
        return Err(Error::Configuration(format!(
            "Error, Url are not allowed in token path for `{}`",
            configured
        )));
    }

    let mut token = configured.to_string();
    let path = Path::new(configured);
    if path.is_file() {
        token = fs::read_to_string(path)
            .map_err(|e| {
                Error::Configuration(format!("Error, failed to read token file {}: {}", configured, e))
            })?
            .trim()
            .to_string();
    }

    if token.contains('\n') {
        return Err(Error::Configuration(format!(
            "Error, the token in `{}` is multiline",
            configured
        )));
    }

    Ok(token.trim().to_string())
}

fn encode_query(query: &Query) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

// Keeps error logs on one line
fn sanitize(body: &str) -> String {
    body.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Builder for [`Client`]
///
/// Explicit options take precedence over those derived from a kubeconfig.
#[derive(Default)]
pub struct ClientBuilder {
    options: ClientOptions,
    kubeconfig: Option<Kubeconfig>,
    patch_type: PatchType,
    transport: Option<Arc<dyn Transport>>,
    selector: Option<TransportSelector>,
    registry: Option<RepositoryRegistry>,
    materializer: Option<Arc<dyn FileMaterializer>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Kubeconfig) -> Self {
        self.kubeconfig = Some(kubeconfig);
        self
    }

    pub fn with_patch_type(mut self, patch_type: PatchType) -> Self {
        self.patch_type = patch_type;
        self
    }

    /// Use `transport` for every request instead of selecting one
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_transport_selector(mut self, selector: TransportSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_registry(mut self, registry: RepositoryRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Where inline certificate material is written
    pub fn with_materializer(mut self, materializer: Arc<dyn FileMaterializer>) -> Self {
        self.materializer = Some(materializer);
        self
    }

    pub fn build(self) -> Result<Client> {
        let materializer = self
            .materializer
            .unwrap_or_else(|| Arc::new(TempDirMaterializer::default()));

        let options = match &self.kubeconfig {
            Some(kubeconfig) => kubeconfig
                .client_options(materializer.as_ref())?
                .overlay(&self.options),
            None => self.options,
        };
        let settings = Settings::default().merged(&options, true)?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                settings: RwLock::new(settings),
                patch_type: RwLock::new(self.patch_type),
                transport: RwLock::new(None),
                injected_transport: self.transport,
                selector: self.selector.unwrap_or_default(),
                materializer,
                registry: RwLock::new(self.registry.unwrap_or_default()),
                repositories: Mutex::new(HashMap::new()),
                materialized: Mutex::new(HashMap::new()),
            }),
        })
    }
}
