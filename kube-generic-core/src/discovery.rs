//! Resource coordinates as served by the API, and the cached per-type descriptor.
use crate::{
    gvk::{GroupVersion, GroupVersionKind},
    scope::Scope,
};
use serde::{Deserialize, Serialize};

/// Information about a Kubernetes API resource
///
/// Enough information to address instances of a kind through REST paths.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ApiResource {
    /// Resource group, empty for core group.
    pub group: String,
    /// group version
    pub version: String,
    /// apiVersion of the resource (v1 for core group,
    /// groupName/groupVersions for other).
    pub api_version: String,
    /// Singular PascalCase name of the resource
    pub kind: String,
    /// Plural name of the resource
    pub plural: String,
}

impl ApiResource {
    /// Creates an ApiResource from group, version, kind and plural name.
    pub fn from_gvk_with_plural(gvk: &GroupVersionKind, plural: &str) -> Self {
        ApiResource {
            api_version: gvk.api_version(),
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            plural: plural.to_string(),
        }
    }

    /// Creates an ApiResource from group, version and kind.
    ///
    /// # Warning
    /// This function will **guess** the resource plural name.
    /// Usually, this is ok, but for CRDs with complex pluralisations it can fail.
    /// Consider using [`ApiResource::from_gvk_with_plural`] to explicitly set the plural,
    /// or resolve the type through discovery.
    pub fn from_gvk(gvk: &GroupVersionKind) -> Self {
        ApiResource::from_gvk_with_plural(gvk, &to_plural(&gvk.kind.to_ascii_lowercase()))
    }

    /// The group version this resource is served under
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::gv(&self.group, &self.version)
    }
}

/// Derived, type-level metadata needed to address a registered type
///
/// Resolved once per type and never mutated afterwards.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct TypeDescriptor {
    /// Resource coordinates
    pub resource: ApiResource,
    /// Whether instances are partitioned by namespace
    pub scope: Scope,
}

impl TypeDescriptor {
    /// Construct a descriptor from resource coordinates and a scope
    pub fn new(resource: ApiResource, scope: Scope) -> Self {
        Self { resource, scope }
    }

    /// Whether the addressed resource is namespaced
    pub fn is_namespaced(&self) -> bool {
        self.scope.is_namespaced()
    }

    /// The plural resource path segment
    pub fn plural(&self) -> &str {
        &self.resource.plural
    }

    /// The kind of the described type
    pub fn kind(&self) -> &str {
        &self.resource.kind
    }

    /// The group version prefix used for requests, e.g. `/apis/apps/v1`
    pub fn url_prefix(&self) -> String {
        self.resource.group_version().url_prefix()
    }
}

/// Simple pluralizer for lowercased kinds. Handles the special cases.
pub fn to_plural(word: &str) -> String {
    if word == "endpoints" || word == "endpointslices" {
        return word.to_owned();
    } else if word == "nodemetrics" {
        return "nodes".to_owned();
    } else if word == "podmetrics" {
        return "pods".to_owned();
    }

    // Words ending in s, x, z, ch, sh will be pluralized with -es (eg. foxes).
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }

    // Words ending in y that are preceded by a consonant will be pluralized by
    // replacing y with -ies (eg. puppies).
    if word.ends_with('y') {
        if let Some(c) = word.chars().nth(word.len() - 2) {
            if !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') {
                // Remove 'y' and add `ies`
                let mut chars = word.chars();
                chars.next_back();
                return format!("{}ies", chars.as_str());
            }
        }
    }

    // All other words will have "s" added to the end (eg. days).
    format!("{}s", word)
}
