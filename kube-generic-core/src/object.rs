//! The object capability trait, object keys and generic object lists.
use std::{
    any::{type_name, TypeId},
    fmt,
    hash::{Hash, Hasher},
};

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// An accessor trait for any object that can be sent to, and decoded from, the API
///
/// Every registered type exposes its identity fields through [`ObjectMeta`].
/// Types from `k8s_openapi` get this for free; custom types implement the two accessors.
/// The runtime type itself (see [`TypeInfo`]) is what metadata resolution is keyed on,
/// field values are never consulted for it.
pub trait Object: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Metadata that all persisted resources must have
    fn meta(&self) -> &ObjectMeta;
    /// Metadata that all persisted resources must have
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

/// Implement accessor trait for any ObjectMeta-using Kubernetes Resource
impl<K> Object for K
where
    K: k8s_openapi::Metadata<Ty = ObjectMeta>,
    K: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn meta(&self) -> &ObjectMeta {
        self.metadata()
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        self.metadata_mut()
    }
}

/// Helper methods for identity fields of objects.
pub trait ObjectExt: Object {
    /// The name of the object, if set
    fn name(&self) -> Option<&str>;
    /// Sets the name of the object
    fn set_name(&mut self, name: impl Into<String>);
    /// The namespace the object is in, if set
    fn namespace(&self) -> Option<&str>;
    /// Sets the namespace of the object
    fn set_namespace(&mut self, namespace: impl Into<String>);
    /// The resource version, if set
    fn resource_version(&self) -> Option<&str>;
    /// An [`ObjectKey`] pointing at this object
    fn object_key(&self) -> ObjectKey;
}

impl<K: Object> ObjectExt for K {
    fn name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    fn set_name(&mut self, name: impl Into<String>) {
        self.meta_mut().name = Some(name.into());
    }

    fn namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }

    fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.meta_mut().namespace = Some(namespace.into());
    }

    fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    fn object_key(&self) -> ObjectKey {
        ObjectKey {
            name: self.name().unwrap_or_default().to_string(),
            namespace: self.namespace().map(String::from),
        }
    }
}

/// Runtime identity of a registered type
///
/// Equality and hashing only consider the [`TypeId`]; the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Identity of `K`
    pub fn of<K: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<K>(),
            name: type_name::<K>(),
        }
    }

    /// The [`TypeId`] used as the cache key
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Immutable (name, namespace) pair identifying a single instance
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Name of the object
    pub name: String,
    /// Namespace of the object, `None` for cluster-scoped objects
    pub namespace: Option<String>,
}

impl ObjectKey {
    /// Key for a cluster-scoped object
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Key for a namespaced object
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Set the namespace of this key
    #[must_use]
    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => write!(f, "{}/{}", ns, self.name),
            _ => f.write_str(&self.name),
        }
    }
}

impl<K: Object> From<&K> for ObjectKey {
    fn from(obj: &K) -> Self {
        obj.object_key()
    }
}

/// A generic Kubernetes object list
///
/// This is used instead of a full struct for `DeploymentList`, `PodList`, etc.
/// Lists are decoded in place, so an empty list is the usual target of a list call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ObjectList<T> {
    /// ListMeta - carries the `resourceVersion` and `continue` token
    #[serde(default)]
    pub metadata: ListMeta,

    /// The items we are actually interested in
    #[serde(bound(deserialize = "Vec<T>: Deserialize<'de>"), default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ObjectList<T> {
    fn default() -> Self {
        Self {
            metadata: ListMeta::default(),
            items: Vec::new(),
        }
    }
}

impl<T> ObjectList<T> {
    /// `iter` returns an Iterator over the elements of this ObjectList
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// `iter_mut` returns an Iterator of mutable references to the elements of this ObjectList
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// The continue token for the next page, if the server returned one
    pub fn continue_token(&self) -> Option<&str> {
        self.metadata.continue_.as_deref().filter(|t| !t.is_empty())
    }
}

impl<T> IntoIterator for ObjectList<T> {
    type IntoIter = ::std::vec::IntoIter<Self::Item>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ObjectList<T> {
    type IntoIter = ::std::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Pod};

    #[test]
    fn identity_accessors_round_trip_through_meta() {
        let mut cm = ConfigMap::default();
        assert_eq!(cm.name(), None);
        cm.set_name("cfg");
        cm.set_namespace("ns");
        assert_eq!(cm.meta().name.as_deref(), Some("cfg"));
        assert_eq!(cm.object_key(), ObjectKey::namespaced("ns", "cfg"));
        assert_eq!(ObjectKey::from(&cm).to_string(), "ns/cfg");
    }

    #[test]
    fn type_info_is_keyed_by_type() {
        assert_eq!(TypeInfo::of::<Pod>(), TypeInfo::of::<Pod>());
        assert_ne!(TypeInfo::of::<Pod>(), TypeInfo::of::<ConfigMap>());
        assert!(TypeInfo::of::<Pod>().name().ends_with("Pod"));
    }

    #[test]
    fn list_decodes_without_items() {
        let list: ObjectList<Pod> =
            serde_json::from_value(serde_json::json!({"metadata": {"continue": "abc"}})).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.continue_token(), Some("abc"));
        let empty: ObjectList<Pod> = ObjectList::default();
        assert_eq!(empty.continue_token(), None);
    }
}
