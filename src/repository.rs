//! Per-kind repositories
//!
//! A [`Repository`] is a reusable query builder bound to one client and one
//! resource kind. Selectors staged with [`Repository::set_label_selector`] and
//! [`Repository::set_field_selector`] apply to the next listing call only: they
//! are consumed before that call is dispatched, whether it succeeds or not.

use crate::client::{ApiRequest, Client, ClientInner, PatchType, Query};
use crate::collection::Collection;
use crate::kinds::{Node, Pod};
use crate::model::{Kind, Model};
use crate::selector::{FieldSelector, LabelSelector, StagedSelectors};
use crate::stream::StreamingParser;
use crate::{Error, Result};
use http::Method;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::DeleteOptions;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace};

/// Watch parameters added by [`Repository::stream`] unless the caller overrides them
const WATCH_DEFAULTS: [(&str, &str); 2] = [("watch", "1"), ("timeoutSeconds", "30")];

/// Status returned when a continuation token has expired
const GONE: u16 = 410;

/// CRUD, listing and watch operations for resources of kind `K`
///
/// Repositories are obtained from a [`Client`] (`client.pods()?`) and hold a
/// non-owning handle to it; calls made after the client is dropped fail with
/// [`Error::Logic`].
pub struct Repository<K: Kind> {
    client: Weak<ClientInner>,
    resource: String,
    namespaced: bool,
    selectors: Mutex<StagedSelectors>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Kind> Repository<K> {
    pub(crate) fn located(client: Weak<ClientInner>, resource: String, namespaced: bool) -> Self {
        Self {
            client,
            resource,
            namespaced,
            selectors: Mutex::new(StagedSelectors::default()),
            _kind: PhantomData,
        }
    }

    /// URI segment of the collection
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    /// POST `model` to the collection
    pub fn create(&self, model: &Model<K>) -> Result<Model<K>> {
        let request = self
            .request(Method::POST, self.collection_path())
            .with_json(model.schema_value());
        Model::from_value(self.client()?.send_json(request)?)
    }

    /// PUT `model` over the resource of the same name
    pub fn update(&self, model: &Model<K>) -> Result<Model<K>> {
        let request = self
            .request(Method::PUT, self.item_path(name_of(model)?))
            .with_json(model.schema_value());
        Model::from_value(self.client()?.send_json(request)?)
    }

    /// PATCH with the client's current patch type
    pub fn patch(&self, model: &Model<K>) -> Result<Model<K>> {
        let request = self
            .request(Method::PATCH, self.item_path(name_of(model)?))
            .with_json(model.schema_value());
        Model::from_value(self.client()?.send_json(request)?)
    }

    /// PATCH with a JSON patch, whatever the client's patch type
    pub fn apply_json_patch(&self, model: &Model<K>, patch: &json_patch::Patch) -> Result<Model<K>> {
        let request = self
            .request(Method::PATCH, self.item_path(name_of(model)?))
            .with_json(serde_json::to_value(patch)?)
            .with_patch_type(PatchType::Json);
        Model::from_value(self.client()?.send_json(request)?)
    }

    /// Patch `model` if a resource of that name exists, create it otherwise
    ///
    /// The existence probe consumes any staged selectors.
    pub fn apply(self: &Arc<Self>, model: &Model<K>) -> Result<Model<K>> {
        if self.exists(name_of(model)?)? {
            self.patch(model)
        } else {
            self.create(model)
        }
    }

    pub fn delete(&self, model: &Model<K>, options: Option<&DeleteOptions>) -> Result<Value> {
        self.delete_by_name(name_of(model)?, options)
    }

    /// DELETE the named resource, sending `options` as the body when given
    pub fn delete_by_name(&self, name: &str, options: Option<&DeleteOptions>) -> Result<Value> {
        let mut request = self.request(Method::DELETE, self.item_path(name));
        if let Some(options) = options {
            request = request.with_json(delete_options_schema(options)?);
        }
        self.client()?.send_json(request)
    }

    /// Stage a label selector for the next listing call
    pub fn set_label_selector(self: &Arc<Self>, selector: LabelSelector) -> &Arc<Self> {
        self.selectors.lock().expect("selectors lock poisoned").label = selector;
        self
    }

    /// Stage a field selector for the next listing call
    pub fn set_field_selector(self: &Arc<Self>, selector: FieldSelector) -> &Arc<Self> {
        self.stage_field_selector(selector);
        self
    }

    /// List resources matching the staged selectors and `query`
    ///
    /// Caller query values win over the rendered selectors and empty values
    /// are dropped. Fails with [`Error::MissingItems`] when the answer has no
    /// `items`.
    pub fn find(self: &Arc<Self>, query: Query) -> Result<Collection<K>> {
        let query = self.selector_query(Query::new(), query);
        let client = self.client()?;

        let response = client.send_json(
            self.request(Method::GET, self.collection_path())
                .with_query(query.clone()),
        )?;
        self.create_collection(response, query)
    }

    /// [`find`](Self::find) returning at most `limit` items per page
    pub fn find_with_limit(self: &Arc<Self>, mut query: Query, limit: u32) -> Result<Collection<K>> {
        query.insert("limit".to_string(), limit.to_string());
        self.find(query)
    }

    /// First resource matching the staged selectors
    pub fn first(self: &Arc<Self>) -> Result<Option<Model<K>>> {
        Ok(self.find(Query::new())?.into_iter().next())
    }

    /// Whether a resource named `name` exists
    ///
    /// Staged selectors are discarded and replaced by a `metadata.name` field
    /// selector.
    pub fn exists(self: &Arc<Self>, name: &str) -> Result<bool> {
        self.reset_selectors();
        self.set_field_selector(FieldSelector::new().eq("metadata.name", name));
        Ok(self.first()?.is_some())
    }

    /// Watch `model`, handing the live response body to `parser`
    ///
    /// `watch=1` and `timeoutSeconds=30` are sent unless `query` overrides them.
    pub fn stream(
        &self,
        model: &Model<K>,
        parser: &mut dyn StreamingParser,
        query: Query,
    ) -> Result<&Self> {
        self.stage_field_selector(
            FieldSelector::new().eq("metadata.name", model.name().unwrap_or_default()),
        );

        let defaults = WATCH_DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let query = self.selector_query(defaults, query);
        let client = self.client()?;

        let mut response = client.send_stream(
            self.request(Method::GET, self.collection_path())
                .with_query(query),
        )?;
        parser.parse(response.body_mut())?;
        Ok(self)
    }

    /// Re-run a listing from a continuation token
    ///
    /// An expired token surfaces as [`Error::TimeExceeded`].
    pub fn continue_listing(self: &Arc<Self>, mut query: Query, token: &str) -> Result<Collection<K>> {
        query.insert("continue".to_string(), token.to_string());
        match self.find(query) {
            Err(Error::ApiServer { code: GONE, message, .. }) => {
                Err(Error::TimeExceeded { code: GONE, message })
            }
            other => other,
        }
    }

    /// Wrap a list response into a collection paginated from `query`
    pub fn create_collection(self: &Arc<Self>, response: Value, query: Query) -> Result<Collection<K>> {
        let Value::Object(mut response) = response else {
            return Err(missing_items());
        };
        let items = match response.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Err(missing_items()),
            Some(other) => {
                return Err(Error::Parse(format!(
                    "Error, items of a {} list must be a list, got {}",
                    K::KIND,
                    other
                )))
            }
        };

        let token = response
            .get("metadata")
            .and_then(|m| m.get("continue"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Collection::from_items(items)?.with_pagination(self, query, token))
    }

    fn client(&self) -> Result<Client> {
        self.client.upgrade().map(Client::from_inner).ok_or_else(|| {
            Error::Logic(format!(
                "Error, the client of the {} repository has been dropped",
                self.resource
            ))
        })
    }

    fn request(&self, method: Method, path: String) -> ApiRequest {
        ApiRequest::new(method, path)
            .with_namespaced(self.namespaced)
            .with_api_version(K::api_version_override())
    }

    fn collection_path(&self) -> String {
        format!("/{}", self.resource)
    }

    fn item_path(&self, name: &str) -> String {
        format!("/{}/{}", self.resource, name)
    }

    fn stage_field_selector(&self, selector: FieldSelector) {
        self.selectors.lock().expect("selectors lock poisoned").field = selector;
    }

    fn reset_selectors(&self) {
        self.selectors.lock().expect("selectors lock poisoned").take_rendered();
    }

    /// Consume the staged selectors and merge them between `defaults` and `query`
    fn selector_query(&self, defaults: Query, query: Query) -> Query {
        let (label, field) = self
            .selectors
            .lock()
            .expect("selectors lock poisoned")
            .take_rendered();
        trace!("Selectors for {}: label={:?} field={:?}", self.resource, label, field);

        let mut merged = defaults;
        merged.insert("labelSelector".to_string(), label);
        merged.insert("fieldSelector".to_string(), field);
        merged.extend(query);
        merged.retain(|_, value| !value.is_empty());
        merged
    }
}

impl Repository<Pod> {
    /// Logs of `pod` as text
    pub fn logs(&self, pod: &Model<Pod>, query: Query) -> Result<String> {
        let path = format!("{}/log", self.item_path(name_of(pod)?));
        self.client()?
            .send_text(self.request(Method::GET, path).with_query(query))
    }

    /// Run the command described by `query` in `pod`
    pub fn exec(&self, pod: &Model<Pod>, query: Query) -> Result<String> {
        let path = format!("{}/exec", self.item_path(name_of(pod)?));
        self.client()?
            .send_text(self.request(Method::POST, path).with_query(query))
    }
}

impl Repository<Node> {
    /// Call `path` through the API server proxy of `node`; the body is always `{}`
    pub fn proxy(&self, node: &Model<Node>, method: Method, path: &str, query: Query) -> Result<Value> {
        let path = format!(
            "{}/proxy/{}",
            self.item_path(name_of(node)?),
            path.trim_start_matches('/')
        );
        debug!("Proxying {} {} through node", method, path);
        self.client()?
            .send_json(
                self.request(method, path)
                    .with_query(query)
                    .with_json(Value::Object(Map::new())),
            )
    }
}

impl<K: Kind> fmt::Debug for Repository<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("kind", &K::KIND)
            .field("resource", &self.resource)
            .field("namespaced", &self.namespaced)
            .finish()
    }
}

fn name_of<K: Kind>(model: &Model<K>) -> Result<&str> {
    model
        .name()
        .ok_or_else(|| Error::InvalidRequest(format!("Error, the {} has no metadata.name", K::KIND)))
}

fn missing_items() -> Error {
    Error::MissingItems("Error, no items returned by the Kubernetes API".to_string())
}

fn delete_options_schema(options: &DeleteOptions) -> Result<Value> {
    let mut schema = Map::new();
    schema.insert("kind".to_string(), Value::String("DeleteOptions".to_string()));
    schema.insert("apiVersion".to_string(), Value::String("v1".to_string()));
    if let Value::Object(fields) = serde_json::to_value(options)? {
        for (key, value) in fields {
            if key != "kind" && key != "apiVersion" {
                schema.insert(key, value);
            }
        }
    }
    Ok(Value::Object(schema))
}
