//! Repository registry
//!
//! Maps accessor names (`pods`, `configMaps`, ...) to the repository a client
//! should build for them. Entries are typed: an entry built with
//! [`RepositoryEntry::of`] produces a `Repository<K>` for one [`Kind`], and the
//! client refuses to hand it out as any other kind.

use crate::client::ClientInner;
use crate::model::Kind;
use crate::repository::Repository;
use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) type SharedRepository = Arc<dyn Any + Send + Sync>;

type RepositoryBuilder = fn(Weak<ClientInner>, &RepositoryEntry) -> SharedRepository;

/// Registration of one repository implementation
#[derive(Clone)]
pub struct RepositoryEntry {
    type_id: TypeId,
    type_name: &'static str,
    kind: &'static str,
    api_version: &'static str,
    resource: String,
    namespaced: bool,
    build: RepositoryBuilder,
}

impl RepositoryEntry {
    /// Entry for the repository of kind `K`, located where `K` says
    pub fn of<K: Kind>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            type_name: std::any::type_name::<K>(),
            kind: K::KIND,
            api_version: K::API_VERSION,
            resource: K::RESOURCE.to_string(),
            namespaced: K::NAMESPACED,
            build: build_repository::<K>,
        }
    }

    /// Serve the repository from another URI segment
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn api_version(&self) -> &'static str {
        self.api_version
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn is_for<K: Kind>(&self) -> bool {
        self.type_id == TypeId::of::<K>()
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn build(&self, client: Weak<ClientInner>) -> SharedRepository {
        (self.build)(client, self)
    }

    /// Check that the entry describes a usable repository
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(Error::Logic(format!(
                "Error, {} does not declare a kind name",
                self.type_name
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::Logic(format!(
                "Error, {} does not declare an API version",
                self.type_name
            )));
        }
        if self.resource.trim().is_empty()
            || self.resource.contains('/')
            || self.resource.chars().any(char::is_whitespace)
        {
            return Err(Error::Logic(format!(
                "Error, {} is not a valid resource for {}",
                if self.resource.is_empty() { "an empty string" } else { self.resource.as_str() },
                self.type_name
            )));
        }
        Ok(())
    }
}

fn build_repository<K: Kind>(client: Weak<ClientInner>, entry: &RepositoryEntry) -> SharedRepository {
    Arc::new(Repository::<K>::located(
        client,
        entry.resource.clone(),
        entry.namespaced,
    ))
}

impl fmt::Debug for RepositoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryEntry")
            .field("kind", &self.kind)
            .field("api_version", &self.api_version)
            .field("resource", &self.resource)
            .field("namespaced", &self.namespaced)
            .finish()
    }
}

/// Accessor name to repository mapping
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    entries: BTreeMap<String, RepositoryEntry>,
}

impl RepositoryRegistry {
    /// Registry holding every built-in kind
    pub fn new() -> Self {
        let entries = crate::kinds::builtin_entries()
            .into_iter()
            .map(|(name, entry)| (name.to_string(), entry))
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register or override `name`, returning the replaced entry
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        entry: RepositoryEntry,
    ) -> Result<Option<RepositoryEntry>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Logic(
                "Error, a repository must be registered under a name".to_string(),
            ));
        }
        entry.validate()?;
        Ok(self.entries.insert(name, entry))
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RepositoryEntry> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
