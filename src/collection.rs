//! Typed pages of models returned by list requests

use crate::client::Query;
use crate::model::{IntoModel, Kind, Model};
use crate::repository::Repository;
use crate::Result;
use std::fmt;
use std::ops::Index;
use std::sync::{Arc, Weak};

/// Ordered models of kind `K`, with the pagination state of the page they came from
///
/// A collection returned by [`Repository::find`] remembers the query that
/// produced it and the continuation token issued by the server, if any. The
/// repository is held weakly: a collection never keeps its repository (or the
/// client behind it) alive.
pub struct Collection<K: Kind> {
    items: Vec<Model<K>>,
    repository: Option<Weak<Repository<K>>>,
    query: Option<Query>,
    continue_token: Option<String>,
}

impl<K: Kind> Collection<K> {
    /// Standalone collection, without pagination state
    pub fn new(items: Vec<Model<K>>) -> Self {
        Self {
            items,
            repository: None,
            query: None,
            continue_token: None,
        }
    }

    /// Promote raw items (maps, JSON values or models) into a collection
    pub fn from_items<I, T>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: IntoModel<K>,
    {
        let items = items
            .into_iter()
            .map(IntoModel::into_model)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(items))
    }

    /// Attach the repository, originating query and continuation token
    pub fn with_pagination(
        mut self,
        repository: &Arc<Repository<K>>,
        query: Query,
        continue_token: Option<String>,
    ) -> Self {
        self.repository = Some(Arc::downgrade(repository));
        self.query = Some(query);
        self.continue_token = continue_token;
        self
    }

    /// Whether the server announced a further page
    pub fn has_next(&self) -> bool {
        self.continue_token.is_some()
    }

    pub fn continue_token(&self) -> Option<&str> {
        self.continue_token.as_deref()
    }

    /// Query that produced this page
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` when there is nothing to continue from: no
    /// continuation token, no originating query, or no live repository.
    pub fn continue_page(&self) -> Result<Option<Collection<K>>> {
        let (Some(repository), Some(query), Some(token)) =
            (&self.repository, &self.query, &self.continue_token)
        else {
            return Ok(None);
        };
        let Some(repository) = repository.upgrade() else {
            return Ok(None);
        };

        repository.continue_listing(query.clone(), token).map(Some)
    }

    pub fn first(&self) -> Option<&Model<K>> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&Model<K>> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model<K>> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Model<K>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Model<K>> {
        self.items
    }
}

impl<K: Kind> Default for Collection<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: Kind> Clone for Collection<K> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            repository: self.repository.clone(),
            query: self.query.clone(),
            continue_token: self.continue_token.clone(),
        }
    }
}

impl<K: Kind> fmt::Debug for Collection<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &K::KIND)
            .field("items", &self.items)
            .field("query", &self.query)
            .field("continue_token", &self.continue_token)
            .finish()
    }
}

impl<K: Kind> Index<usize> for Collection<K> {
    type Output = Model<K>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<K: Kind> IntoIterator for Collection<K> {
    type Item = Model<K>;
    type IntoIter = std::vec::IntoIter<Model<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, K: Kind> IntoIterator for &'a Collection<K> {
    type Item = &'a Model<K>;
    type IntoIter = std::slice::Iter<'a, Model<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<K: Kind> FromIterator<Model<K>> for Collection<K> {
    fn from_iter<I: IntoIterator<Item = Model<K>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
