//! Abstractions on top of k8s_openapi::apimachinery::pkg::apis::meta::v1
use crate::{error::DiscoveryError, Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use kube_generic_core::{
    discovery::{ApiResource, TypeDescriptor},
    gvk::{GroupVersion, GroupVersionKind, ParseGroupVersionError},
    Scope,
};

/// Creates an `ApiResource` from a `meta::v1::APIResource` instance + its groupversion.
pub(crate) fn parse_apiresource(
    ar: &APIResource,
    group_version: &str,
) -> Result<ApiResource, ParseGroupVersionError> {
    let gv: GroupVersion = group_version.parse()?;
    // NB: not safe to use this with subresources (they don't have api_versions)
    Ok(ApiResource {
        group: ar.group.clone().unwrap_or_else(|| gv.group.clone()),
        version: ar.version.clone().unwrap_or_else(|| gv.version.clone()),
        api_version: gv.api_version(),
        kind: ar.kind.to_string(),
        plural: ar.name.clone(),
    })
}

/// Finds the top-level resource serving `gvk` in a group version document
pub(crate) fn find_kind(list: &APIResourceList, gvk: &GroupVersionKind) -> Result<Option<TypeDescriptor>> {
    // skip subresources
    let found = list
        .resources
        .iter()
        .find(|res| !res.name.contains('/') && res.kind == gvk.kind);
    let Some(res) = found else {
        return Ok(None);
    };
    // NB: should be infallible from discovery when k8s api is well-behaved, but..
    let ar = parse_apiresource(res, &list.group_version)
        .map_err(|ParseGroupVersionError(s)| Error::Discovery(DiscoveryError::InvalidGroupVersion(s)))?;
    Ok(Some(TypeDescriptor::new(ar, Scope::from_namespaced(res.namespaced))))
}
