//! Resolution of type metadata through API discovery
//!
//! Types registered by kind only have no static resource mapping.
//! [`DiscoveryResolver`] fetches the `APIResourceList` of their group version
//! and picks the top-level resource serving the kind.
use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use http::header;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube_generic_core::{gvk::GroupVersion, request, TypeDescriptor, TypeInfo};
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::{resolver::Resolve, scheme::Scheme, Client, Error, Result};

mod parse;

type ListCell = Arc<OnceCell<Arc<APIResourceList>>>;

/// A [`Resolve`] implementation backed by the scheme and API discovery
///
/// Static mappings from the [`Scheme`] are used as-is without any request.
/// A registered kind the cluster does not serve is reported as [`Error::TypeNotRegistered`].
/// Discovery documents are fetched at most once per group version; a failed
/// download is not remembered and is retried by the next resolution.
pub struct DiscoveryResolver {
    client: Client,
    scheme: Arc<Scheme>,
    lists: Mutex<HashMap<GroupVersion, ListCell>>,
}

impl DiscoveryResolver {
    /// Resolver querying the cluster behind `client` for types of `scheme`
    pub fn new(client: Client, scheme: Arc<Scheme>) -> Self {
        Self {
            client,
            scheme,
            lists: Mutex::new(HashMap::new()),
        }
    }

    async fn resource_list(&self, gv: &GroupVersion) -> Result<Arc<APIResourceList>> {
        let cell = self.lists.lock().entry(gv.clone()).or_default().clone();
        cell.get_or_try_init(|| async {
            let url = gv.url_prefix();
            tracing::debug!(group_version = %gv.api_version(), "fetching discovery document");
            let mut req = http::Request::get(url)
                .header(header::ACCEPT, "application/json")
                .body(vec![])
                .map_err(|e| Error::BuildRequest(request::Error::BuildRequest(e)))?;
            req.extensions_mut().insert("discovery");
            self.client.request::<APIResourceList>(req).await.map(Arc::new)
        })
        .await
        .cloned()
    }

    async fn discover(&self, ty: TypeInfo) -> Result<TypeDescriptor> {
        let reg = self
            .scheme
            .get(&ty)
            .ok_or(Error::TypeNotRegistered { type_name: ty.name() })?;
        if let Some(mapping) = &reg.mapping {
            return Ok(mapping.clone());
        }
        let list = self.resource_list(&reg.gvk.group_version()).await?;
        parse::find_kind(&list, &reg.gvk)?.ok_or_else(|| {
            tracing::debug!(gvk = %reg.gvk, "kind not served by the cluster");
            Error::TypeNotRegistered { type_name: ty.name() }
        })
    }
}

impl Resolve for DiscoveryResolver {
    fn resolve(&self, ty: TypeInfo) -> BoxFuture<'_, Result<TypeDescriptor>> {
        Box::pin(self.discover(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::pin_mut;
    use http::{Request, Response, StatusCode};
    use http_body_util::Full;
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, StatefulSet},
        core::v1::{Node, Pod},
    };
    use kube_generic_core::GroupVersionKind;
    use tower_test::mock;

    fn apps_v1() -> serde_json::Value {
        serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "apps/v1",
            "resources": [
                { "name": "deployments", "singularName": "deployment", "namespaced": true, "kind": "Deployment", "verbs": ["get", "list"] },
                { "name": "deployments/scale", "singularName": "", "group": "autoscaling", "version": "v1", "namespaced": true, "kind": "Scale", "verbs": ["get"] },
                { "name": "statefulsets", "singularName": "statefulset", "namespaced": true, "kind": "StatefulSet", "verbs": ["get", "list"] }
            ]
        })
    }

    fn scheme() -> Arc<Scheme> {
        Scheme::builder()
            .register_kind::<Deployment>(GroupVersionKind::gvk("apps", "v1", "Deployment"))
            .register_kind::<StatefulSet>(GroupVersionKind::gvk("apps", "v1", "StatefulSet"))
            .register_kind::<DaemonSet>(GroupVersionKind::gvk("apps", "v1", "DaemonSet"))
            .register::<Node>()
            .build()
    }

    #[tokio::test]
    async fn discovery_document_is_fetched_once_per_group_version() {
        let (mock_service, handle) = mock::pair::<Request<Vec<u8>>, Response<Full<Bytes>>>();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            while let Some((request, send)) = handle.next_request().await {
                counted.fetch_add(1, Ordering::SeqCst);
                assert_eq!(request.uri().to_string(), "/apis/apps/v1");
                assert_eq!(request.extensions().get::<&'static str>(), Some(&"discovery"));
                send.send_response(Response::new(Full::new(Bytes::from(apps_v1().to_string()))));
            }
        });

        let resolver = DiscoveryResolver::new(Client::new(mock_service, "default"), scheme());
        let deploy = resolver.resolve(TypeInfo::of::<Deployment>()).await.unwrap();
        assert_eq!(deploy.plural(), "deployments");
        assert!(deploy.is_namespaced());
        let sts = resolver.resolve(TypeInfo::of::<StatefulSet>()).await.unwrap();
        assert_eq!(sts.plural(), "statefulsets");

        // kind missing from the served document
        let err = resolver.resolve(TypeInfo::of::<DaemonSet>()).await.unwrap_err();
        assert!(matches!(err, Error::TypeNotRegistered { type_name } if type_name.ends_with("DaemonSet")));

        drop(resolver);
        spawned.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn static_mappings_and_unknown_types_need_no_request() {
        let (mock_service, handle) = mock::pair::<Request<Vec<u8>>, Response<Full<Bytes>>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            assert!(handle.next_request().await.is_none(), "unexpected request");
        });

        let resolver = DiscoveryResolver::new(Client::new(mock_service, "default"), scheme());
        let node = resolver.resolve(TypeInfo::of::<Node>()).await.unwrap();
        assert_eq!(node.plural(), "nodes");
        let err = resolver.resolve(TypeInfo::of::<Pod>()).await.unwrap_err();
        assert!(matches!(err, Error::TypeNotRegistered { .. }));

        drop(resolver);
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn failed_download_is_retried() {
        let (mock_service, handle) = mock::pair::<Request<Vec<u8>>, Response<Full<Bytes>>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_request, send) = handle.next_request().await.expect("service not called");
            send.send_response(
                Response::builder()
                    .status(StatusCode::SERVICE_UNAVAILABLE)
                    .body(Full::new(Bytes::from_static(b"unavailable")))
                    .unwrap(),
            );
            let (_request, send) = handle.next_request().await.expect("discovery not retried");
            send.send_response(Response::new(Full::new(Bytes::from(apps_v1().to_string()))));
        });

        let resolver = DiscoveryResolver::new(Client::new(mock_service, "default"), scheme());
        let err = resolver.resolve(TypeInfo::of::<Deployment>()).await.unwrap_err();
        assert!(matches!(err, Error::Api(ref ae) if ae.code == 503));
        let deploy = resolver.resolve(TypeInfo::of::<Deployment>()).await.unwrap();
        assert_eq!(deploy.resource.api_version, "apps/v1");
        spawned.await.unwrap();
    }
}
