//! Registration of Rust types against the kinds they represent
//!
//! A [`Scheme`] is built once through [`SchemeBuilder`] and is immutable afterwards.
//! Resolvers consult it to map the runtime type of an object to a [`GroupVersionKind`],
//! and optionally to a static resource mapping that needs no discovery.
use std::{any::TypeId, collections::HashMap, sync::Arc};

use kube_generic_core::{
    discovery::ApiResource, gvk::GroupVersionKind, Object, Scope, StaticScope, TypeDescriptor, TypeInfo,
};

/// A registered type
#[derive(Debug, Clone)]
pub struct Registration {
    /// The runtime type
    pub type_info: TypeInfo,
    /// The kind the type represents
    pub gvk: GroupVersionKind,
    /// Resource name and scope, when known without discovery
    pub mapping: Option<TypeDescriptor>,
}

/// Immutable mapping from Rust types to kinds
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    types: HashMap<TypeId, Registration>,
}

impl Scheme {
    /// Start building a scheme
    pub fn builder() -> SchemeBuilder {
        SchemeBuilder::default()
    }

    /// The registration of a runtime type, if any
    pub fn get(&self, ty: &TypeInfo) -> Option<&Registration> {
        self.types.get(&ty.id())
    }

    /// Whether `K` is registered
    pub fn recognizes<K: 'static>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<K>())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Builder for a [`Scheme`]
///
/// ```
/// use k8s_openapi::api::{apps::v1::Deployment, core::v1::Node};
/// use kube_generic::Scheme;
///
/// let scheme = Scheme::builder().register::<Deployment>().register::<Node>().build();
/// assert!(scheme.recognizes::<Deployment>());
/// ```
#[derive(Debug, Default)]
pub struct SchemeBuilder {
    types: HashMap<TypeId, Registration>,
}

impl SchemeBuilder {
    fn insert<K: 'static>(mut self, gvk: GroupVersionKind, mapping: Option<TypeDescriptor>) -> Self {
        let type_info = TypeInfo::of::<K>();
        tracing::trace!(type_name = type_info.name(), %gvk, "registering type");
        self.types.insert(type_info.id(), Registration {
            type_info,
            gvk,
            mapping,
        });
        self
    }

    /// Register a `k8s_openapi` resource with its static group, version, plural and scope
    ///
    /// Subresource types have no scope of their own and are registered without a mapping.
    #[must_use]
    pub fn register<K>(self) -> Self
    where
        K: k8s_openapi::Resource + Object,
        K::Scope: StaticScope,
    {
        let gvk = GroupVersionKind::gvk(K::GROUP, K::VERSION, K::KIND);
        let mapping = <K::Scope as StaticScope>::scope().map(|scope| {
            TypeDescriptor::new(ApiResource::from_gvk_with_plural(&gvk, K::URL_PATH_SEGMENT), scope)
        });
        self.insert::<K>(gvk, mapping)
    }

    /// Register a type by kind only
    ///
    /// The resource name and scope have to be found through discovery.
    #[must_use]
    pub fn register_kind<K: Object>(self, gvk: GroupVersionKind) -> Self {
        self.insert::<K>(gvk, None)
    }

    /// Register a type with an explicit resource mapping
    #[must_use]
    pub fn register_resource<K: Object>(self, resource: ApiResource, scope: Scope) -> Self {
        let gvk = GroupVersionKind::gvk(&resource.group, &resource.version, &resource.kind);
        self.insert::<K>(gvk, Some(TypeDescriptor::new(resource, scope)))
    }

    /// Freeze into a shareable [`Scheme`]
    pub fn build(self) -> Arc<Scheme> {
        Arc::new(Scheme { types: self.types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::{
        apps::v1::Deployment,
        core::v1::{ConfigMap, Node, Pod},
    };

    #[test]
    fn static_registration_uses_type_constants() {
        let scheme = Scheme::builder().register::<Deployment>().register::<Node>().build();
        assert_eq!(scheme.len(), 2);

        let deploy = scheme.get(&TypeInfo::of::<Deployment>()).unwrap();
        assert_eq!(deploy.gvk, GroupVersionKind::gvk("apps", "v1", "Deployment"));
        let mapping = deploy.mapping.as_ref().unwrap();
        assert_eq!(mapping.plural(), "deployments");
        assert!(mapping.is_namespaced());

        let node = scheme.get(&TypeInfo::of::<Node>()).unwrap();
        assert_eq!(node.mapping.as_ref().unwrap().scope, Scope::Cluster);
        assert!(!scheme.recognizes::<Pod>());
    }

    #[test]
    fn kind_and_resource_registration() {
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        let scheme = Scheme::builder()
            .register_kind::<ConfigMap>(gvk.clone())
            .register_resource::<Pod>(
                ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")),
                Scope::Namespaced,
            )
            .build();

        let cm = scheme.get(&TypeInfo::of::<ConfigMap>()).unwrap();
        assert_eq!(cm.gvk, gvk);
        assert!(cm.mapping.is_none());

        let pod = scheme.get(&TypeInfo::of::<Pod>()).unwrap();
        assert_eq!(pod.mapping.as_ref().unwrap().plural(), "pods");
    }
}
