//! Error handling in [`kube_generic`][crate]
use std::path::PathBuf;

use thiserror::Error;

pub use kube_generic_core::ErrorResponse;
use kube_generic_core::PatchError;

/// Possible errors when working with [`kube_generic`][crate]
///
/// Metadata resolution and payload construction errors are returned before any request is sent.
/// Server and transport errors are surfaced as received, without interpretation.
#[derive(Error, Debug)]
pub enum Error {
    /// The type is unknown to the scheme, or cannot be mapped to a resource
    #[error("type {type_name} is not registered in the scheme")]
    TypeNotRegistered {
        /// Rust type name of the object
        type_name: &'static str,
    },

    /// Building the patch payload from the current object failed
    #[error("failed to encode patch: {0}")]
    PatchEncoding(#[source] PatchError),

    /// ApiError for when things fail
    ///
    /// The `Status` body returned by the API server, or a reconstruction of it
    /// when the body could not be parsed.
    #[error("ApiError: {0} ({0:?})")]
    Api(#[source] ErrorResponse),

    /// Service error from the transport stack
    #[error("ServiceError: {0}")]
    Service(#[source] tower::BoxError),

    /// The call was cancelled through the client's cancellation token
    #[error("request cancelled")]
    Cancelled,

    /// The call did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The response body did not match the shape of the target object
    #[error("Error deserializing response: {0}")]
    Decode(#[source] serde_json::Error),

    /// UTF-8 Error
    #[error("UTF-8 Error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// Failed to build request
    #[error("Failed to build request: {0}")]
    BuildRequest(#[source] kube_generic_core::request::Error),

    /// Failed to serialize a request body
    #[error("Failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),

    /// Discovery errors
    #[error("Error from discovery: {0}")]
    Discovery(#[source] DiscoveryError),

    /// Configuration error
    #[error("Error loading kubeconfig: {0}")]
    Kubeconfig(#[source] ConfigError),

    /// The cluster url uses https but no TLS stack is available
    #[error("TLS required but no TLS stack selected")]
    TlsRequired,
}

impl From<kube_generic_core::request::Error> for Error {
    fn from(err: kube_generic_core::request::Error) -> Self {
        match err {
            kube_generic_core::request::Error::SerializeBody(e) => Error::SerializeBody(e),
            other => Error::BuildRequest(other),
        }
    }
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when loading config
pub enum ConfigError {
    #[error("Failed to determine current context")]
    CurrentContextNotSet,

    #[error("Merging kubeconfig with mismatching kind")]
    KindMismatch,
    #[error("Merging kubeconfig with mismatching apiVersion")]
    ApiVersionMismatch,

    #[error("Unable to load current context: {context_name}")]
    LoadContext { context_name: String },
    #[error("Unable to load cluster of context: {cluster_name}")]
    LoadClusterOfContext { cluster_name: String },
    #[error("Cluster {cluster_name} has no server url")]
    MissingServer { cluster_name: String },

    #[error("Unable to find path of kubeconfig")]
    NoKubeconfigPath,

    #[error("Failed to read '{path:?}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse Kubeconfig YAML: {0}")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("Failed to parse cluster url: {0}")]
    InvalidUri(#[source] http::uri::InvalidUri),
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when using API discovery
pub enum DiscoveryError {
    #[error("Invalid GroupVersion: {0}")]
    InvalidGroupVersion(String),
}
