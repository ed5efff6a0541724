//! Generic client for any registered Kubernetes type
//!
//! Instead of one typed api handle per resource, a single [`GenericClient`] performs
//! create, update, delete, patch, get, list and status updates for every type registered
//! in a [`Scheme`]. The resource name, group version and scope of a type are resolved once
//! through a [`Resolve`] implementation and kept in a [`MetadataCache`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use k8s_openapi::api::core::v1::{ConfigMap, Pod};
//! use kube_generic::{
//!     core::{params::InNamespace, ObjectKey, ObjectList},
//!     Client, Config, DiscoveryResolver, GenericClient, MetadataCache, Scheme,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Read the kubeconfig to find the cluster and namespace.
//!     let config = Config::from_kubeconfig(&Default::default())?;
//!     let client = Client::try_from(config)?;
//!
//!     let scheme = Scheme::builder().register::<Pod>().register::<ConfigMap>().build();
//!     let cache = Arc::new(MetadataCache::new(DiscoveryResolver::new(client.clone(), scheme)));
//!     let generic = GenericClient::new(client, cache);
//!
//!     let mut pod = Pod::default();
//!     generic.get(&ObjectKey::namespaced("default", "my-pod"), &mut pod).await?;
//!
//!     let mut cms = ObjectList::<ConfigMap>::default();
//!     generic.list(&mut cms, &[&InNamespace::new("kube-system")]).await?;
//!     for cm in &cms {
//!         println!("found configmap {:?}", cm.metadata.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For more details, see:
//!
//! - [`Client`](crate::client) for the transport and its middleware
//! - [`Config`](crate::config) for loading cluster settings from a kubeconfig
//! - [`GenericClient`] for the operations
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
#[doc(inline)]
pub use client::Client;

pub mod config;
#[doc(inline)]
pub use config::Config;

pub mod error;
#[doc(inline)]
pub use error::Error;

pub mod scheme;
pub use scheme::{Scheme, SchemeBuilder};

pub mod resolver;
pub use resolver::{Resolve, SchemeResolver};

pub mod discovery;
pub use discovery::DiscoveryResolver;

pub mod cache;
pub use cache::MetadataCache;

pub mod generic;
pub use generic::GenericClient;

/// Re-exports from kube-generic-core
pub use kube_generic_core as core;

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
