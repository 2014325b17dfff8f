//! Typed wrappers around raw resource attributes
//!
//! A [`Model`] holds the attribute tree of one API object exactly as supplied.
//! The resource kind it represents is a type parameter implementing [`Kind`],
//! which also carries the API version and the URI segment used by repositories.
//! `kind` and `apiVersion` are only injected when the model is serialized
//! with [`Model::schema`].

use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// API version of the core group, served under `api/v1`
pub const DEFAULT_API_VERSION: &str = "v1";

/// Raw attribute tree of a model
pub type Attributes = Map<String, Value>;

/// A resource kind: its name, API version and location in the API
pub trait Kind: Send + Sync + 'static {
    /// Singular kind name, e.g. `Pod`
    const KIND: &'static str;
    /// `v1` for the core group, `<group>/<version>` otherwise
    const API_VERSION: &'static str = DEFAULT_API_VERSION;
    /// Serialize the kind name with a trailing `s`
    const PLURAL_KIND: bool = false;
    /// URI segment of the collection, e.g. `pods`
    const RESOURCE: &'static str;
    /// Whether the collection lives under `/namespaces/<ns>`
    const NAMESPACED: bool = true;

    /// Kind name as written into serialized schemas
    fn kind_name() -> String {
        if Self::PLURAL_KIND {
            format!("{}s", Self::KIND)
        } else {
            Self::KIND.to_string()
        }
    }

    /// API version to put in request URIs; `None` for the core `v1` group
    fn api_version_override() -> Option<&'static str> {
        if Self::API_VERSION == DEFAULT_API_VERSION {
            None
        } else {
            Some(Self::API_VERSION)
        }
    }
}

/// One API resource instance of kind `K`
pub struct Model<K: Kind> {
    attributes: Attributes,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Kind> Model<K> {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            _kind: PhantomData,
        }
    }

    /// Build from a JSON value
    ///
    /// Objects become the attribute tree; `null` and empty arrays stand for an
    /// empty tree. Anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(attributes) => Ok(Self::new(attributes)),
            Value::Null => Ok(Self::new(Attributes::new())),
            Value::Array(items) if items.is_empty() => Ok(Self::new(Attributes::new())),
            other => Err(Error::Parse(format!(
                "{} attributes must be a map, got {}",
                K::KIND,
                value_type(&other)
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("Failed to parse JSON encoded attributes: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML encoded attributes: {}", e)))?;
        Self::from_value(value)
    }

    /// Build from a typed resource, e.g. a `k8s_openapi` object
    pub fn from_resource<R: Serialize>(resource: &R) -> Result<Self> {
        Self::from_value(serde_json::to_value(resource)?)
    }

    /// Convert into a typed resource, using the serialized schema
    pub fn to_resource<R: DeserializeOwned>(&self) -> Result<R> {
        Ok(serde_json::from_value(self.schema_value())?)
    }

    /// Attributes exactly as supplied
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Non-empty string value of `metadata.<key>`
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.attributes
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata("name")
    }

    /// Typed view of `metadata`
    pub fn object_meta(&self) -> Result<ObjectMeta> {
        match self.attributes.get("metadata") {
            Some(metadata) => Ok(serde_json::from_value(metadata.clone())?),
            None => Ok(ObjectMeta::default()),
        }
    }

    /// Editable copy of this model; the model itself is left untouched
    pub fn explore(&self) -> Explorer<K> {
        Explorer::new(self.clone())
    }

    /// Copy of this model with `modifier` applied to its attributes
    pub fn update_model<F>(&self, modifier: F) -> Self
    where
        F: FnOnce(Attributes) -> Attributes,
    {
        Self::new(modifier(self.attributes.clone()))
    }

    pub fn api_version() -> &'static str {
        K::API_VERSION
    }

    /// Attributes preceded by `kind` and `apiVersion`
    pub fn schema_value(&self) -> Value {
        let mut schema = Attributes::new();
        schema.insert("kind".to_string(), Value::String(K::kind_name()));
        schema.insert(
            "apiVersion".to_string(),
            Value::String(K::API_VERSION.to_string()),
        );
        for (key, value) in &self.attributes {
            schema.insert(key.clone(), value.clone());
        }

        for key in ["metadata", "spec"] {
            if let Some(value) = schema.get_mut(key) {
                normalize_empty_arrays(value);
            }
        }

        Value::Object(schema)
    }

    /// Pretty-printed JSON schema sent to the API
    pub fn schema(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.schema_value())?)
    }
}

/// Turn empty arrays held by map entries into empty maps
///
/// Some API fields must be objects even when empty, while inputs decoded from
/// loosely typed sources tend to carry them as `[]`.
fn normalize_empty_arrays(value: &mut Value) {
    match value {
        Value::Array(items) if items.is_empty() => *value = Value::Object(Map::new()),
        Value::Array(items) => items.iter_mut().for_each(normalize_nested),
        Value::Object(map) => map.values_mut().for_each(normalize_empty_arrays),
        _ => {}
    }
}

// Array elements are not map entries; only their own entries are normalized.
fn normalize_nested(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(normalize_empty_arrays),
        Value::Array(items) => items.iter_mut().for_each(normalize_nested),
        _ => {}
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

impl<K: Kind> Clone for Model<K> {
    fn clone(&self) -> Self {
        Self::new(self.attributes.clone())
    }
}

impl<K: Kind> fmt::Debug for Model<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("kind", &K::KIND)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl<K: Kind> PartialEq for Model<K> {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl<K: Kind> Default for Model<K> {
    fn default() -> Self {
        Self::new(Attributes::new())
    }
}

impl<K: Kind> fmt::Display for Model<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.schema().map_err(|_| fmt::Error)?;
        f.write_str(&schema)
    }
}

impl<K: Kind> From<Attributes> for Model<K> {
    fn from(attributes: Attributes) -> Self {
        Self::new(attributes)
    }
}

impl<K: Kind> TryFrom<Value> for Model<K> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Anything a collection can promote to a `Model<K>`
pub trait IntoModel<K: Kind> {
    fn into_model(self) -> Result<Model<K>>;
}

impl<K: Kind> IntoModel<K> for Model<K> {
    fn into_model(self) -> Result<Model<K>> {
        Ok(self)
    }
}

impl<K: Kind> IntoModel<K> for Value {
    fn into_model(self) -> Result<Model<K>> {
        Model::from_value(self)
    }
}

impl<K: Kind> IntoModel<K> for Attributes {
    fn into_model(self) -> Result<Model<K>> {
        Ok(Model::new(self))
    }
}

/// Editable copy of a model, navigated by key or path
///
/// The explorer owns a clone of the model it was obtained from, so the source
/// model never changes. Edits show up on [`Explorer::model`]; sub-scopes from
/// [`Explorer::enter`] borrow the clone's nested maps in place.
///
/// # Example
///
/// ```
/// use kube_repository_client::kinds::Pod;
/// use kube_repository_client::Model;
/// use serde_json::json;
///
/// let pod: Model<Pod> = Model::from_value(json!({"metadata": {"name": "web"}})).unwrap();
/// let mut explorer = pod.explore();
/// explorer.set_path(&["metadata", "labels", "app"], "web").unwrap();
///
/// assert_eq!(explorer.model().attributes()["metadata"]["labels"]["app"], "web");
/// assert!(pod.attributes()["metadata"].get("labels").is_none());
/// ```
pub struct Explorer<K: Kind> {
    model: Model<K>,
}

impl<K: Kind> Explorer<K> {
    pub fn new(model: Model<K>) -> Self {
        Self { model }
    }

    /// The edited model
    pub fn model(&self) -> &Model<K> {
        &self.model
    }

    pub fn into_model(self) -> Model<K> {
        self.model
    }

    /// Scope over the whole attribute tree
    pub fn root(&mut self) -> AttributeScope<'_> {
        AttributeScope::new(&mut self.model.attributes)
    }

    /// Scope over the sub-map under `key`
    pub fn enter(&mut self, key: &str) -> Option<AttributeScope<'_>> {
        match self.model.attributes.get_mut(key) {
            Some(Value::Object(map)) => Some(AttributeScope::new(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.model.attributes, key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        lookup_path(&self.model.attributes, path)
    }

    /// Set `key`; a `null` value removes it
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.root().set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.model.attributes.remove(key)
    }

    /// Set the value at `path`, creating intermediate maps; `null` removes it
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> Result<&mut Self> {
        self.root().set_path(path, value)?;
        Ok(self)
    }

    pub fn delete_path(&mut self, path: &[&str]) -> Option<Value> {
        self.root().delete_path(path)
    }
}

impl<K: Kind> Clone for Explorer<K> {
    fn clone(&self) -> Self {
        Self::new(self.model.clone())
    }
}

impl<K: Kind> fmt::Debug for Explorer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Explorer").field("model", &self.model).finish()
    }
}

/// Mutable view over one map of an explorer's attribute tree
#[derive(Debug)]
pub struct AttributeScope<'a> {
    attributes: &'a mut Attributes,
}

impl<'a> AttributeScope<'a> {
    pub fn new(attributes: &'a mut Attributes) -> Self {
        Self { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&*self.attributes, key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Scope over the sub-map under `key`
    pub fn enter(&mut self, key: &str) -> Option<AttributeScope<'_>> {
        match self.attributes.get_mut(key) {
            Some(Value::Object(map)) => Some(AttributeScope::new(map)),
            _ => None,
        }
    }

    /// Set `key`; a `null` value removes it
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        match value.into() {
            Value::Null => {
                self.attributes.remove(&key);
            }
            value => {
                self.attributes.insert(key, value);
            }
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        lookup_path(&*self.attributes, path)
    }

    /// Set the value at `path`, creating intermediate maps; `null` removes it
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> Result<&mut Self> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| Error::InvalidRequest("attribute path is empty".to_string()))?;

        let value = value.into();
        if value.is_null() {
            self.delete_path(path);
            return Ok(self);
        }

        let mut current = &mut *self.attributes;
        for key in parents {
            let entry = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry.as_object_mut().ok_or_else(|| {
                Error::InvalidRequest(format!("attribute {} is not a map", key))
            })?;
        }

        current.insert(last.to_string(), value);
        Ok(self)
    }

    pub fn delete_path(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &mut *self.attributes;
        for key in parents {
            current = current.get_mut(*key)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    pub fn as_map(&self) -> &Attributes {
        self.attributes
    }

    pub fn to_map(&self) -> Attributes {
        self.attributes.clone()
    }
}

fn lookup<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a Value> {
    attributes.get(key).filter(|v| !v.is_null())
}

fn lookup_path<'a>(attributes: &'a Attributes, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = attributes;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    lookup(current, last)
}
