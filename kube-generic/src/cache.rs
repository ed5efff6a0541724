//! Memoization of resolved type metadata
use std::{any::TypeId, collections::HashMap, fmt, sync::Arc};

use kube_generic_core::{Object, ObjectExt, ObjectKey, TypeDescriptor, TypeInfo};
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::{resolver::Resolve, Result};

type Entry = Arc<OnceCell<Arc<TypeDescriptor>>>;

/// Concurrency safe cache of [`TypeDescriptor`]s keyed by runtime type
///
/// The first lookup of a type invokes the [`Resolve`] implementation; concurrent first lookups
/// of the same type wait for that single resolution instead of starting their own.
/// Lookups of different types never wait on each other.
///
/// Only successful resolutions are remembered. A failed resolution leaves the entry empty
/// and the next lookup of that type resolves again.
///
/// A cache is an ordinary value: create one per [`GenericClient`](crate::GenericClient),
/// or share one between clients through an `Arc`.
pub struct MetadataCache {
    resolver: Box<dyn Resolve>,
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl MetadataCache {
    /// Empty cache over a resolver
    pub fn new(resolver: impl Resolve + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, id: TypeId) -> Entry {
        if let Some(entry) = self.entries.read().get(&id) {
            return entry.clone();
        }
        self.entries.write().entry(id).or_default().clone()
    }

    async fn lookup(&self, ty: TypeInfo) -> Result<Arc<TypeDescriptor>> {
        let entry = self.entry(ty.id());
        if let Some(td) = entry.get() {
            tracing::trace!(type_name = ty.name(), "type descriptor cache hit");
            return Ok(td.clone());
        }
        let td = entry
            .get_or_try_init(|| async {
                tracing::debug!(type_name = ty.name(), "resolving type descriptor");
                match self.resolver.resolve(ty).await {
                    Ok(td) => {
                        tracing::debug!(type_name = ty.name(), resource = td.plural(), scope = ?td.scope, "resolved type descriptor");
                        Ok(Arc::new(td))
                    }
                    Err(err) => {
                        tracing::debug!(type_name = ty.name(), "type resolution failed: {err}");
                        Err(err)
                    }
                }
            })
            .await?;
        Ok(td.clone())
    }

    /// Descriptor of the type `K`, without needing an instance
    ///
    /// Used where only a key or an empty target is available.
    pub async fn descriptor_for<K: 'static>(&self) -> Result<Arc<TypeDescriptor>> {
        self.lookup(TypeInfo::of::<K>()).await
    }

    /// Descriptor of the runtime type of `obj`
    ///
    /// Field values of `obj` are not consulted.
    pub async fn type_descriptor<K: Object>(&self, _obj: &K) -> Result<Arc<TypeDescriptor>> {
        self.descriptor_for::<K>().await
    }

    /// Descriptor and identity of a populated object
    pub async fn object_meta<K: Object>(&self, obj: &K) -> Result<(Arc<TypeDescriptor>, ObjectKey)> {
        let td = self.type_descriptor(obj).await?;
        Ok((td, obj.object_key()))
    }

    /// Number of resolved types
    pub fn len(&self) -> usize {
        self.entries.read().values().filter(|e| e.initialized()).count()
    }

    /// Whether no type is resolved yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache").field("resolved", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::future::{self, BoxFuture};
    use k8s_openapi::api::core::v1::{ConfigMap, Node, Pod};
    use kube_generic_core::{ApiResource, GroupVersionKind, Scope};

    use crate::Error;

    /// Counts resolutions, sleeps during each one and fails the first `failures` calls
    #[derive(Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        failures: usize,
    }

    impl Resolve for Counting {
        fn resolve(&self, ty: TypeInfo) -> BoxFuture<'_, Result<TypeDescriptor>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = n < self.failures;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if fail {
                    return Err(Error::TypeNotRegistered { type_name: ty.name() });
                }
                let kind = ty.name().rsplit("::").next().unwrap_or_default();
                let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", kind));
                Ok(TypeDescriptor::new(ar, Scope::Namespaced))
            })
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(MetadataCache::new(Counting {
            calls: calls.clone(),
            failures: 0,
        }));

        let lookups = (0..16).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.descriptor_for::<Pod>().await.unwrap() })
        });
        let results = future::join_all(lookups).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let first = results[0].as_ref().unwrap().clone();
        assert_eq!(first.plural(), "pods");
        for td in results {
            assert!(Arc::ptr_eq(&first, &td.unwrap()));
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn independent_types_resolve_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = MetadataCache::new(Counting {
            calls: calls.clone(),
            failures: 0,
        });
        let (pod, cm) = tokio::join!(cache.descriptor_for::<Pod>(), cache.descriptor_for::<ConfigMap>());
        assert_eq!(pod.unwrap().plural(), "pods");
        assert_eq!(cm.unwrap().plural(), "configmaps");

        let node = Node::default();
        let (td, key) = cache.object_meta(&node).await.unwrap();
        assert_eq!(td.plural(), "nodes");
        assert_eq!(key, ObjectKey::default());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // all hits now
        cache.descriptor_for::<Pod>().await.unwrap();
        cache.type_descriptor(&ConfigMap::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = MetadataCache::new(Counting {
            calls: calls.clone(),
            failures: 1,
        });
        let err = cache.descriptor_for::<Pod>().await.unwrap_err();
        assert!(matches!(err, Error::TypeNotRegistered { .. }));
        assert!(cache.is_empty());

        let td = cache.descriptor_for::<Pod>().await.unwrap();
        assert_eq!(td.plural(), "pods");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }
}
