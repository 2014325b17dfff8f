//! Synchronous, typed client for Kubernetes-style HTTP APIs.
//!
//! A [`Client`] owns the connection settings and hands out one [`Repository`]
//! per resource kind. Repositories build list, watch and CRUD requests, and
//! wrap list answers into [`Collection`]s of [`Model`]s that remember how to
//! fetch their next page.
//!
//! # Examples
//!
//! ## Listing with selectors and pagination
//!
//! ```no_run
//! use kube_repository_client::{Client, ClientOptions, LabelSelector, Query};
//!
//! let client = Client::new(
//!     ClientOptions::default()
//!         .with_master("https://k8s.example.com")
//!         .with_token("my-token")
//!         .with_namespace("shop"),
//! )?;
//!
//! let deployments = client.deployments()?;
//! let mut page = deployments
//!     .set_label_selector(LabelSelector::new().eq("tier", "frontend"))
//!     .find_with_limit(Query::new(), 50)?;
//! loop {
//!     for deployment in &page {
//!         println!("{:?}", deployment.name());
//!     }
//!     match page.continue_page()? {
//!         Some(next) => page = next,
//!         None => break,
//!     }
//! }
//! # Ok::<(), kube_repository_client::Error>(())
//! ```
//!
//! ## Creating from a kubeconfig
//!
//! ```no_run
//! use kube_repository_client::kinds::ConfigMap;
//! use kube_repository_client::{Client, Model};
//! use serde_json::json;
//!
//! let client = Client::from_kubeconfig_file("/home/me/.kube/config")?;
//! let config: Model<ConfigMap> = Model::from_value(json!({
//!     "metadata": {"name": "settings"},
//!     "data": {"mode": "fast"},
//! }))?;
//! client.config_maps()?.apply(&config)?;
//! # Ok::<(), kube_repository_client::Error>(())
//! ```

mod client;
mod collection;
mod config;
mod error;
pub mod kinds;
pub mod kubeconfig;
pub mod materialize;
mod model;
mod registry;
mod repository;
mod selector;
mod stream;
pub mod transport;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod kubeconfig_test;
#[cfg(test)]
mod model_test;
#[cfg(test)]
mod registry_test;

pub use client::{ApiRequest, Body, Client, ClientBuilder, PatchType, Query};
pub use collection::Collection;
pub use config::{ClientOptions, Settings, DEFAULT_NAMESPACE};
pub use error::{cap_body, ApiErrorKind, Error, Result, MAX_ERROR_BODY_LENGTH};
pub use kubeconfig::{Kubeconfig, KubeconfigFormat};
pub use model::{AttributeScope, Attributes, Explorer, IntoModel, Kind, Model, DEFAULT_API_VERSION};
pub use registry::{RepositoryEntry, RepositoryRegistry};
pub use repository::Repository;
pub use selector::{FieldSelector, LabelSelector};
pub use stream::{JsonLinesParser, StreamingParser, WatchEvent};
pub use transport::{Request, Response, TransferError, Transport, TransportSelector};
