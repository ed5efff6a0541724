use super::file_config::{Cluster, Context, Kubeconfig};
use crate::error::ConfigError;

/// KubeConfigOptions stores options used when loading kubeconfig file.
#[derive(Default, Clone, Debug)]
pub struct KubeConfigOptions {
    /// The named context to load
    pub context: Option<String>,
    /// The cluster to load
    pub cluster: Option<String>,
}

/// ConfigLoader loads the current context and its cluster from a kubeconfig file.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    pub current_context: Context,
    pub cluster: Cluster,
    pub cluster_name: String,
}

impl ConfigLoader {
    /// Returns a config loader based on the cluster information from the kubeconfig file.
    pub fn new_from_options(options: &KubeConfigOptions) -> Result<Self, ConfigError> {
        let config = Kubeconfig::read()?;
        Self::load(config, options.context.as_ref(), options.cluster.as_ref())
    }

    pub fn new_from_kubeconfig(config: Kubeconfig, options: &KubeConfigOptions) -> Result<Self, ConfigError> {
        Self::load(config, options.context.as_ref(), options.cluster.as_ref())
    }

    pub fn load(
        config: Kubeconfig,
        context: Option<&String>,
        cluster: Option<&String>,
    ) -> Result<Self, ConfigError> {
        let context_name = if let Some(name) = context {
            name
        } else if let Some(name) = &config.current_context {
            name
        } else {
            return Err(ConfigError::CurrentContextNotSet);
        };

        let current_context = config
            .contexts
            .iter()
            .find(|named_context| &named_context.name == context_name)
            .and_then(|named_context| named_context.context.clone())
            .ok_or_else(|| ConfigError::LoadContext {
                context_name: context_name.clone(),
            })?;

        let cluster_name = cluster.unwrap_or(&current_context.cluster).clone();
        let cluster = config
            .clusters
            .iter()
            .find(|named_cluster| named_cluster.name == cluster_name)
            .and_then(|named_cluster| named_cluster.cluster.clone())
            .ok_or_else(|| ConfigError::LoadClusterOfContext {
                cluster_name: cluster_name.clone(),
            })?;

        Ok(ConfigLoader {
            current_context,
            cluster,
            cluster_name,
        })
    }

    pub fn cluster_url(&self) -> Result<http::Uri, ConfigError> {
        self.cluster
            .server
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingServer {
                cluster_name: self.cluster_name.clone(),
            })?
            .parse::<http::Uri>()
            .map_err(ConfigError::InvalidUri)
    }
}
