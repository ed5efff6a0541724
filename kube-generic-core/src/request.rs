//! Request builder type for arbitrary api types
use crate::{discovery::TypeDescriptor, params::QueryParams, patch::PatchType};
use http::{header, Method};
use thiserror::Error;

pub(crate) const JSON_MIME: &str = "application/json";

/// Possible errors when building a request.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build a request.
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] http::Error),

    /// Failed to serialize body.
    #[error("failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),

    /// Failed to validate request.
    #[error("failed to validate request: {0}")]
    Validation(String),
}

/// A fluent request builder for one registered type
///
/// Every call starts at one of the verb entry points ([`Request::post`], [`Request::put`],
/// [`Request::patch`], [`Request::delete`], [`Request::get`], [`Request::list`]) and is then
/// configured in order: scope qualifier, resource segment, name, subresource, body, query parameters.
/// Configuration never fails eagerly; the first problem is reported by [`Request::build`].
///
/// ```
/// use kube_generic_core::{
///     discovery::{ApiResource, TypeDescriptor},
///     gvk::GroupVersionKind,
///     request::Request,
///     Scope,
/// };
///
/// let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"));
/// let td = TypeDescriptor::new(ar, Scope::Namespaced);
/// let req = Request::get(&td)
///     .namespace_if_scoped(Some("ns"))
///     .resource()
///     .name("web")
///     .build()
///     .unwrap();
/// assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/web");
/// ```
#[derive(Debug)]
pub struct Request<'a> {
    descriptor: &'a TypeDescriptor,
    method: Method,
    verb: &'static str,
    content_type: Option<&'static str>,
    namespace: Option<String>,
    resource: Option<&'a str>,
    name: Option<String>,
    subresource: Option<String>,
    body: Vec<u8>,
    query: String,
    error: Option<Error>,
}

/// Verb entry points
impl<'a> Request<'a> {
    fn new(descriptor: &'a TypeDescriptor, method: Method, verb: &'static str) -> Self {
        Self {
            descriptor,
            method,
            verb,
            content_type: None,
            namespace: None,
            resource: None,
            name: None,
            subresource: None,
            body: Vec::new(),
            query: String::new(),
            error: None,
        }
    }

    /// Create an instance
    pub fn post(descriptor: &'a TypeDescriptor) -> Self {
        Self::new(descriptor, Method::POST, "create")
    }

    /// Replace an instance
    pub fn put(descriptor: &'a TypeDescriptor) -> Self {
        Self::new(descriptor, Method::PUT, "update")
    }

    /// Patch an instance with the given patch type
    pub fn patch(descriptor: &'a TypeDescriptor, patch_type: PatchType) -> Self {
        let mut req = Self::new(descriptor, Method::PATCH, "patch");
        req.content_type = Some(patch_type.content_type());
        req
    }

    /// Delete an instance
    pub fn delete(descriptor: &'a TypeDescriptor) -> Self {
        Self::new(descriptor, Method::DELETE, "delete")
    }

    /// Get a single instance
    pub fn get(descriptor: &'a TypeDescriptor) -> Self {
        Self::new(descriptor, Method::GET, "get")
    }

    /// List a collection
    pub fn list(descriptor: &'a TypeDescriptor) -> Self {
        Self::new(descriptor, Method::GET, "list")
    }
}

// A single url path segment, no separators or query
fn is_path_segment(s: &str) -> bool {
    !s.contains(['/', '?'])
}

/// Configuration chain
impl<'a> Request<'a> {
    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Add the namespace segment when the described resource is namespaced
    ///
    /// The decision is taken from the descriptor only: a cluster-scoped resource never
    /// gets a namespace segment, and an empty namespace adds nothing.
    #[must_use]
    pub fn namespace_if_scoped(mut self, namespace: Option<&str>) -> Self {
        self.namespace = match namespace {
            Some(ns) if self.descriptor.is_namespaced() && !ns.is_empty() => {
                if !is_path_segment(ns) {
                    self.fail(Error::Validation(format!("invalid namespace {ns:?}")));
                }
                Some(ns.to_string())
            }
            _ => None,
        };
        self
    }

    /// Add the plural resource segment of the descriptor
    #[must_use]
    pub fn resource(mut self) -> Self {
        self.resource = Some(self.descriptor.plural());
        self
    }

    /// Address a single instance by name
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        if name.is_empty() {
            self.fail(Error::Validation(format!(
                "a non-empty name is required to {} a {}",
                self.verb,
                self.descriptor.kind()
            )));
        } else if !is_path_segment(name) {
            self.fail(Error::Validation(format!("invalid name {name:?}")));
        }
        self.name = Some(name.to_string());
        self
    }

    /// Address a subresource of the named instance
    #[must_use]
    pub fn subresource(mut self, subresource: &str) -> Self {
        self.subresource = Some(subresource.to_string());
        self
    }

    /// Use raw bytes as the request body
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Serialize a value as the JSON request body
    #[must_use]
    pub fn json_body<T: serde::Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.body = body,
            Err(e) => self.fail(Error::SerializeBody(e)),
        }
        self
    }

    /// Append the query parameters of a finished options value
    #[must_use]
    pub fn versioned_params(mut self, params: &impl QueryParams) -> Self {
        if let Err(e) = params.validate() {
            self.fail(e);
            return self;
        }
        let mut qp = form_urlencoded::Serializer::for_suffix(std::mem::take(&mut self.query), 0);
        params.populate_qp(&mut qp);
        self.query = qp.finish();
        self
    }

    /// Assemble the final `http::Request`
    ///
    /// The verb tag is stored in the request extensions as a `&'static str`.
    pub fn build(self) -> Result<http::Request<Vec<u8>>, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let resource = self
            .resource
            .ok_or_else(|| Error::Validation(format!("no resource segment set for {}", self.verb)))?;
        if self.subresource.is_some() && self.name.is_none() {
            return Err(Error::Validation(format!(
                "subresource requests need a name to {} a {}",
                self.verb,
                self.descriptor.kind()
            )));
        }

        let mut url = self.descriptor.url_prefix();
        if let Some(ns) = &self.namespace {
            url.push_str("/namespaces/");
            url.push_str(ns);
        }
        url.push('/');
        url.push_str(resource);
        for segment in [&self.name, &self.subresource].into_iter().flatten() {
            url.push('/');
            url.push_str(segment);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }

        let mut builder = http::Request::builder()
            .method(self.method)
            .uri(url)
            .header(header::ACCEPT, JSON_MIME);
        if let Some(content_type) = self.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        } else if !self.body.is_empty() {
            builder = builder.header(header::CONTENT_TYPE, JSON_MIME);
        }
        let mut req = builder.body(self.body).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert(self.verb);
        Ok(req)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        discovery::ApiResource,
        gvk::GroupVersionKind,
        params::{ApplyOptions, CreateOptions, DryRunAll, ListOptions, MatchingLabels, PatchOptions},
        scope::Scope,
    };

    fn deployments() -> TypeDescriptor {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment"));
        TypeDescriptor::new(ar, Scope::Namespaced)
    }

    fn nodes() -> TypeDescriptor {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Node"));
        TypeDescriptor::new(ar, Scope::Cluster)
    }

    #[test]
    fn create_path_has_no_name() {
        let td = deployments();
        let req = Request::post(&td)
            .namespace_if_scoped(Some("ns"))
            .resource()
            .body(b"{}".to_vec())
            .versioned_params(&CreateOptions::default())
            .build()
            .unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments");
        assert_eq!(req.headers()[header::CONTENT_TYPE], JSON_MIME);
        assert_eq!(req.extensions().get::<&'static str>(), Some(&"create"));
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn cluster_scope_ignores_namespace() {
        let td = nodes();
        let req = Request::get(&td)
            .namespace_if_scoped(Some("ns"))
            .resource()
            .name("node-1")
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/node-1");
        assert!(req.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn empty_namespace_adds_no_segment() {
        let td = deployments();
        let req = Request::list(&td)
            .namespace_if_scoped(Some(""))
            .resource()
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/deployments");
        assert_eq!(req.extensions().get::<&'static str>(), Some(&"list"));
    }

    #[test]
    fn status_subresource_for_both_scopes() {
        let td = deployments();
        let req = Request::put(&td)
            .namespace_if_scoped(Some("ns"))
            .resource()
            .name("web")
            .subresource("status")
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/web/status");

        let td = nodes();
        let req = Request::put(&td)
            .namespace_if_scoped(None)
            .resource()
            .name("node-1")
            .subresource("status")
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/node-1/status");
    }

    #[test]
    fn patch_sets_content_type_and_query() {
        let td = deployments();
        let opts = PatchOptions::from_options(&[&DryRunAll]);
        let req = Request::patch(&td, PatchType::Merge)
            .namespace_if_scoped(Some("ns"))
            .resource()
            .name("web")
            .body(br#"{"spec":{}}"#.to_vec())
            .versioned_params(&opts)
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/web?dryRun=All");
        assert_eq!(req.headers()[header::CONTENT_TYPE], "application/merge-patch+json");
    }

    #[test]
    fn params_are_appended() {
        let td = deployments();
        let labels: MatchingLabels = [("app", "web")].into_iter().collect();
        let opts = ListOptions::from_options(&[&labels]);
        let limited = ListOptions {
            limit: Some(2),
            ..ListOptions::default()
        };
        let req = Request::list(&td)
            .resource()
            .versioned_params(&opts)
            .versioned_params(&limited)
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/deployments?labelSelector=app%3Dweb&limit=2");
    }

    #[test]
    fn invalid_requests_are_rejected_at_build() {
        let td = deployments();
        let err = Request::get(&td).resource().name("").build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = Request::get(&td).name("web").build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = Request::put(&td).resource().subresource("status").build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = Request::get(&td).resource().name("web/status").build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = Request::get(&td).resource().name("web?watch=true").build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = Request::get(&td)
            .namespace_if_scoped(Some("a/b"))
            .resource()
            .name("web")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // cluster-scoped descriptors drop the namespace before it is checked
        let nodes = nodes();
        let req = Request::get(&nodes)
            .namespace_if_scoped(Some("a/b"))
            .resource()
            .name("n1")
            .build()
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/n1");

        let long = CreateOptions {
            field_manager: Some("x".repeat(129)),
            ..CreateOptions::default()
        };
        let err = Request::post(&td).resource().versioned_params(&long).build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
