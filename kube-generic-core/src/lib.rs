//! Types and traits for addressing arbitrary registered types against the Kubernetes API
//!
//! This crate holds everything that does not need a client: type descriptors,
//! per-call options, patches and the request builder.
//! The same information is re-exported from `kube-generic` under `kube_generic::core`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod discovery;
pub use discovery::{ApiResource, TypeDescriptor};

pub mod gvk;
pub use gvk::{GroupVersion, GroupVersionKind};

pub mod object;
pub use object::{Object, ObjectExt, ObjectKey, ObjectList, TypeInfo};

pub mod params;

pub mod patch;
pub use patch::{Patch, PatchError, PatchType};

pub mod request;
pub use request::Request;

pub mod scope;
pub use scope::{Scope, StaticScope};

mod error;
pub use error::ErrorResponse;

/// Convient alias for `Result<T, request::Error>`
pub type Result<T, E = request::Error> = std::result::Result<T, E>;
