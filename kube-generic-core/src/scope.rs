//! Namespaced versus cluster-wide addressing of resources.
pub use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope, ResourceScope, SubResourceScope};
use serde::{Deserialize, Serialize};

/// Resource scope
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Scope {
    /// Objects are global
    Cluster,
    /// Each object lives in a namespace
    Namespaced,
}

impl Scope {
    /// Whether objects of this scope are partitioned under a namespace segment
    pub fn is_namespaced(&self) -> bool {
        matches!(self, Scope::Namespaced)
    }

    /// Scope from the `namespaced` flag used in discovery documents
    pub fn from_namespaced(namespaced: bool) -> Self {
        if namespaced {
            Scope::Namespaced
        } else {
            Scope::Cluster
        }
    }
}

/// Getters for statically known scopes
///
/// This allows getting information out of `k8s_openapi::ResourceScope`
/// without the need for specialization.
pub trait StaticScope {
    /// The scope if the type is addressable on its own, `None` for subresource types
    fn scope() -> Option<Scope>;
}

// extend the ResourceScope traits found in k8s-openapi

impl StaticScope for ClusterResourceScope {
    fn scope() -> Option<Scope> {
        Some(Scope::Cluster)
    }
}

impl StaticScope for NamespaceResourceScope {
    fn scope() -> Option<Scope> {
        Some(Scope::Namespaced)
    }
}

impl StaticScope for SubResourceScope {
    fn scope() -> Option<Scope> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_scopes() {
        assert_eq!(NamespaceResourceScope::scope(), Some(Scope::Namespaced));
        assert_eq!(ClusterResourceScope::scope(), Some(Scope::Cluster));
        assert_eq!(SubResourceScope::scope(), None);
        assert!(Scope::from_namespaced(true).is_namespaced());
        assert!(!Scope::from_namespaced(false).is_namespaced());
    }
}
