//! Kubernetes configuration objects from `~/.kube/config` or `$KUBECONFIG`.
//!
//! # Usage
//! Build a [`Config`] with [`Config::new`] or [`Config::from_kubeconfig`], and pass it to a [`Client`][crate::Client].
//! Only the cluster url and the context namespace are taken from a kubeconfig;
//! credentials are not read.
mod file_config;
mod file_loader;

use crate::{Error, Result};
use file_loader::ConfigLoader;
pub use file_loader::KubeConfigOptions;

use std::time::Duration;

/// Configuration object detailing the cluster URL, default namespace, and timeouts.
///
/// It exists to be consumed by the [`Client`][crate::Client].
#[derive(Debug, Clone)]
pub struct Config {
    /// The configured cluster url
    pub cluster_url: http::Uri,
    /// The configured default namespace
    ///
    /// Used for namespaced objects that do not carry a namespace of their own.
    pub default_namespace: String,
    /// Timeout for calls to the Kubernetes API.
    ///
    /// A value of `None` means no timeout
    pub timeout: Option<Duration>,
    /// Timeout for establishing a connection
    pub connect_timeout: Option<Duration>,
    /// Timeout for reading a response from an established connection
    pub read_timeout: Option<Duration>,
}

impl Config {
    /// Construct a new config where only the `cluster_url` is set by the user.
    /// and everything else receives a default value.
    pub fn new(cluster_url: http::Uri) -> Self {
        Self {
            cluster_url,
            default_namespace: String::from("default"),
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: None,
        }
    }

    /// Create configuration from the default local config file
    ///
    /// This will respect the `$KUBECONFIG` evar, but otherwise default to `~/.kube/config`.
    /// You can also customize what context/cluster you want to use here,
    /// but it will default to the current-context.
    pub fn from_kubeconfig(options: &KubeConfigOptions) -> Result<Self> {
        let loader = ConfigLoader::new_from_options(options).map_err(Error::Kubeconfig)?;
        Self::new_from_loader(loader)
    }

    /// Create configuration from a [`Kubeconfig`] struct
    pub fn from_custom_kubeconfig(kubeconfig: Kubeconfig, options: &KubeConfigOptions) -> Result<Self> {
        let loader = ConfigLoader::new_from_kubeconfig(kubeconfig, options).map_err(Error::Kubeconfig)?;
        Self::new_from_loader(loader)
    }

    fn new_from_loader(loader: ConfigLoader) -> Result<Self> {
        let cluster_url = loader.cluster_url().map_err(Error::Kubeconfig)?;
        let default_namespace = loader
            .current_context
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| String::from("default"));
        tracing::debug!(%cluster_url, %default_namespace, "loaded kubeconfig");

        Ok(Self {
            default_namespace,
            ..Self::new(cluster_url)
        })
    }
}

// https://github.com/kube-rs/kube-rs/issues/146#issuecomment-590924397
/// Default Timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(295);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// Expose raw config structs
pub use file_config::{Cluster, Context, Kubeconfig, NamedCluster, NamedContext};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    const CFGRAW: &str = r#"
    apiVersion: v1
    clusters:
    - cluster:
        server: http://0.0.0.0:6443
      name: k3d-test
    - cluster:
        server: http://10.0.0.1:8080/prefix
      name: other
    contexts:
    - context:
        cluster: k3d-test
        user: admin@k3d-test
      name: k3d-test
    - context:
        cluster: other
        namespace: apps
        user: admin@k3d-test
      name: other
    current-context: k3d-test
    kind: Config
    preferences: {}
    users:
    - name: admin@k3d-test
      user:
        client-certificate-data: aGVsbG8K
        client-key-data: aGVsbG8K
    "#;

    #[test]
    fn config_from_file() {
        let file = tempfile::NamedTempFile::new().expect("create config tempfile");
        std::fs::write(file.path(), CFGRAW).unwrap();
        let kubeconfig = Kubeconfig::read_from(file.path()).unwrap();
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).unwrap();
        assert_eq!(config.cluster_url, "http://0.0.0.0:6443/");
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn config_with_named_context() {
        let kubeconfig = Kubeconfig::from_yaml(CFGRAW).unwrap();
        let options = KubeConfigOptions {
            context: Some("other".into()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).unwrap();
        assert_eq!(config.cluster_url, "http://10.0.0.1:8080/prefix");
        assert_eq!(config.default_namespace, "apps");
    }

    #[test]
    fn config_missing_context() {
        let kubeconfig = Kubeconfig::from_yaml(CFGRAW).unwrap();
        let options = KubeConfigOptions {
            context: Some("nope".into()),
            ..Default::default()
        };
        let err = Config::from_custom_kubeconfig(kubeconfig, &options).unwrap_err();
        assert!(matches!(err, Error::Kubeconfig(ConfigError::LoadContext { .. })));

        let err = Config::from_custom_kubeconfig(Kubeconfig::default(), &KubeConfigOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Kubeconfig(ConfigError::CurrentContextNotSet)));
    }

    #[test]
    fn read_missing_file() {
        let err = Kubeconfig::read_from("/definitely/not/here").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
