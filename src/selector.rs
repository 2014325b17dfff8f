//! Label and field selector composition
//!
//! Selectors are rendered into the `labelSelector` / `fieldSelector` query
//! parameters of list and watch requests:
//! - Equality: `key=value`
//! - Inequality: `key!=value`
//! - Existence (label selectors only): `key`
//! - Requirements are joined with commas, equality requirements first

use std::fmt;

/// Label selector staged on a repository
///
/// # Examples
///
/// ```
/// use kube_repository_client::LabelSelector;
///
/// let selector = LabelSelector::new().eq("app", "web").exists("tier").ne("env", "dev");
/// assert_eq!(selector.to_string(), "app=web,tier,env!=dev");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    equality: Vec<(String, Option<String>)>,
    inequality: Vec<(String, String)>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an equality map (a `None` value is a presence test) and an inequality map
    pub fn from_maps<K, V, I, J, L, W>(equality: I, inequality: J) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        J: IntoIterator<Item = (L, W)>,
        K: Into<String>,
        V: Into<String>,
        L: Into<String>,
        W: Into<String>,
    {
        Self {
            equality: equality
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
            inequality: inequality
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Require `key=value`
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equality.push((key.into(), Some(value.into())));
        self
    }

    /// Require the presence of `key`
    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.equality.push((key.into(), None));
        self
    }

    /// Require `key!=value`
    pub fn ne(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inequality.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equality.is_empty() && self.inequality.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let equality = self.equality.iter().map(|(key, value)| match value {
            Some(value) => format!("{}={}", key, value),
            None => key.clone(),
        });
        let inequality = self
            .inequality
            .iter()
            .map(|(key, value)| format!("{}!={}", key, value));

        f.write_str(&equality.chain(inequality).collect::<Vec<_>>().join(","))
    }
}

/// Field selector staged on a repository
///
/// Field selectors have no presence form; every requirement carries a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    equality: Vec<(String, String)>,
    inequality: Vec<(String, String)>,
}

impl FieldSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps<K, V, I, J, L, W>(equality: I, inequality: J) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        J: IntoIterator<Item = (L, W)>,
        K: Into<String>,
        V: Into<String>,
        L: Into<String>,
        W: Into<String>,
    {
        Self {
            equality: equality
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            inequality: inequality
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Require `field=value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equality.push((field.into(), value.into()));
        self
    }

    /// Require `field!=value`
    pub fn ne(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.inequality.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equality.is_empty() && self.inequality.is_empty()
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let equality = self
            .equality
            .iter()
            .map(|(field, value)| format!("{}={}", field, value));
        let inequality = self
            .inequality
            .iter()
            .map(|(field, value)| format!("{}!={}", field, value));

        f.write_str(&equality.chain(inequality).collect::<Vec<_>>().join(","))
    }
}

/// One-shot selector state of a repository
#[derive(Debug, Clone, Default)]
pub(crate) struct StagedSelectors {
    pub label: LabelSelector,
    pub field: FieldSelector,
}

impl StagedSelectors {
    /// Render both selectors and clear the staged state
    pub fn take_rendered(&mut self) -> (String, String) {
        let staged = std::mem::take(self);
        (staged.label.to_string(), staged.field.to_string())
    }
}
