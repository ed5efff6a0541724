//! Operations on any registered type through a single client
use std::sync::Arc;

use kube_generic_core::{
    params::{
        ApplyOption, ApplyOptions, CreateOptions, DeleteOptions, ListOptions, PatchOptions, UpdateOptions,
    },
    Object, ObjectKey, ObjectList, Patch, Request, TypeDescriptor,
};

use crate::{cache::MetadataCache, Client, Error, Result};

const STATUS: &str = "status";

/// A client for every type registered in a [`Scheme`](crate::Scheme)
///
/// Each operation resolves the [`TypeDescriptor`] of the object's type through the [`MetadataCache`],
/// applies the option functions to a fresh options value, builds the request and decodes
/// the response back into the caller's object.
/// Resolution and payload errors are returned before anything is sent.
///
/// Namespaced objects without a namespace are addressed in the client's default namespace,
/// except for [`GenericClient::list`], which lists across all namespaces unless a namespace
/// is set through the list options.
/// Cluster-scoped objects are never addressed with a namespace, whatever their metadata says.
///
/// ```no_run
/// use std::sync::Arc;
/// use k8s_openapi::api::core::v1::ConfigMap;
/// use kube_generic::{
///     core::{params::FieldOwner, ObjectExt},
///     Client, Config, GenericClient, MetadataCache, Scheme, SchemeResolver,
/// };
///
/// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let scheme = Scheme::builder().register::<ConfigMap>().build();
/// let cache = Arc::new(MetadataCache::new(SchemeResolver::new(scheme)));
/// let client = Client::try_from(Config::new("http://127.0.0.1:8001".parse()?))?;
/// let generic = GenericClient::new(client, cache);
///
/// let mut cm = ConfigMap::default();
/// cm.set_name("settings");
/// generic.create(&mut cm, &[&FieldOwner::new("example")]).await?;
/// assert!(cm.resource_version().is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GenericClient {
    client: Client,
    cache: Arc<MetadataCache>,
}

impl GenericClient {
    /// Combine a transport client with a metadata cache
    pub fn new(client: Client, cache: Arc<MetadataCache>) -> Self {
        Self { client, cache }
    }

    /// The underlying transport client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The metadata cache shared by all operations
    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Namespace for a single object, falling back to the default one for namespaced types
    fn namespace_for<'a>(&'a self, td: &TypeDescriptor, key: &'a ObjectKey) -> Option<&'a str> {
        if !td.is_namespaced() {
            return None;
        }
        match key.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => Some(ns),
            _ => Some(self.client.default_namespace()),
        }
    }

    /// Create an object
    ///
    /// The object is sent without a name segment and overwritten with the created object,
    /// so server assigned fields like a generated name or resource version become visible.
    pub async fn create<K: Object>(&self, obj: &mut K, opts: &[&dyn ApplyOption<CreateOptions>]) -> Result<()> {
        let (td, key) = self.client.cancellable(self.cache.object_meta(&*obj)).await?;
        let params = CreateOptions::from_options(opts);
        let req = Request::post(&td)
            .namespace_if_scoped(self.namespace_for(&td, &key))
            .resource()
            .json_body(&*obj)
            .versioned_params(&params)
            .build()?;
        self.client.send(req).await?.decode_into(obj)
    }

    /// Replace an object by name
    pub async fn update<K: Object>(&self, obj: &mut K, opts: &[&dyn ApplyOption<UpdateOptions>]) -> Result<()> {
        self.replace(obj, None, opts).await
    }

    /// Replace the status of an object
    ///
    /// Always addresses the `status` subresource, so only status changes are persisted.
    pub async fn update_status<K: Object>(
        &self,
        obj: &mut K,
        opts: &[&dyn ApplyOption<UpdateOptions>],
    ) -> Result<()> {
        self.replace(obj, Some(STATUS), opts).await
    }

    async fn replace<K: Object>(
        &self,
        obj: &mut K,
        subresource: Option<&str>,
        opts: &[&dyn ApplyOption<UpdateOptions>],
    ) -> Result<()> {
        let (td, key) = self.client.cancellable(self.cache.object_meta(&*obj)).await?;
        let params = UpdateOptions::from_options(opts);
        let mut req = Request::put(&td)
            .namespace_if_scoped(self.namespace_for(&td, &key))
            .resource()
            .name(&key.name);
        if let Some(sub) = subresource {
            req = req.subresource(sub);
        }
        let req = req.json_body(&*obj).versioned_params(&params).build()?;
        self.client.send(req).await?.decode_into(obj)
    }

    /// Delete an object by name
    ///
    /// Only the response status is checked; the body is not decoded.
    pub async fn delete<K: Object>(&self, obj: &K, opts: &[&dyn ApplyOption<DeleteOptions>]) -> Result<()> {
        let (td, key) = self.client.cancellable(self.cache.object_meta(obj)).await?;
        let body = DeleteOptions::from_options(opts).to_body()?;
        let req = Request::delete(&td)
            .namespace_if_scoped(self.namespace_for(&td, &key))
            .resource()
            .name(&key.name)
            .body(body)
            .build()?;
        self.client.send(req).await?.error()
    }

    /// Patch an object by name
    ///
    /// The payload is computed from the object as passed in. When that fails, nothing is sent
    /// and the object is left as it was.
    pub async fn patch<K, P>(&self, obj: &mut K, patch: &P, opts: &[&dyn ApplyOption<PatchOptions>]) -> Result<()>
    where
        K: Object,
        P: Patch<K> + ?Sized,
    {
        self.patch_subresource(obj, None, patch, opts).await
    }

    /// Patch the status of an object
    pub async fn patch_status<K, P>(
        &self,
        obj: &mut K,
        patch: &P,
        opts: &[&dyn ApplyOption<PatchOptions>],
    ) -> Result<()>
    where
        K: Object,
        P: Patch<K> + ?Sized,
    {
        self.patch_subresource(obj, Some(STATUS), patch, opts).await
    }

    async fn patch_subresource<K, P>(
        &self,
        obj: &mut K,
        subresource: Option<&str>,
        patch: &P,
        opts: &[&dyn ApplyOption<PatchOptions>],
    ) -> Result<()>
    where
        K: Object,
        P: Patch<K> + ?Sized,
    {
        let (td, key) = self.client.cancellable(self.cache.object_meta(&*obj)).await?;
        let patch_type = patch.patch_type();
        let data = patch.data(obj).map_err(Error::PatchEncoding)?;
        let params = PatchOptions::from_options(opts);
        params.validate_for(patch_type)?;

        let mut req = Request::patch(&td, patch_type)
            .namespace_if_scoped(self.namespace_for(&td, &key))
            .resource()
            .name(&key.name);
        if let Some(sub) = subresource {
            req = req.subresource(sub);
        }
        let req = req.body(data).versioned_params(&params).build()?;
        self.client.send(req).await?.decode_into(obj)
    }

    /// Get an object by key
    ///
    /// The type is taken from `obj`, which is usually empty; name and namespace come from `key` only.
    pub async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<()> {
        let td = self.client.cancellable(self.cache.descriptor_for::<K>()).await?;
        let req = Request::get(&td)
            .namespace_if_scoped(self.namespace_for(&td, key))
            .resource()
            .name(&key.name)
            .build()?;
        self.client.send(req).await?.decode_into(obj)
    }

    /// List objects of the item type of `list`
    ///
    /// Lists across all namespaces unless a namespace is set, e.g. with
    /// [`InNamespace`](kube_generic_core::params::InNamespace).
    pub async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &[&dyn ApplyOption<ListOptions>],
    ) -> Result<()> {
        let td = self.client.cancellable(self.cache.descriptor_for::<K>()).await?;
        let params = ListOptions::from_options(opts);
        let req = Request::list(&td)
            .namespace_if_scoped(params.namespace.as_deref())
            .resource()
            .versioned_params(&params)
            .build()?;
        self.client.send(req).await?.decode_into(list)
    }
}
