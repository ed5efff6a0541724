//! Mapping a runtime type to the metadata needed to address it
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use kube_generic_core::{TypeDescriptor, TypeInfo};

use crate::{scheme::Scheme, Error, Result};

/// Resolves the [`TypeDescriptor`] of a runtime type
///
/// Only the type is consulted, never the field values of an instance.
/// Unknown types fail with [`Error::TypeNotRegistered`].
/// Implementations are invoked through a [`MetadataCache`](crate::MetadataCache),
/// which makes sure a type is resolved at most once at a time.
pub trait Resolve: Send + Sync {
    /// Resolve the descriptor of `ty`
    fn resolve(&self, ty: TypeInfo) -> BoxFuture<'_, Result<TypeDescriptor>>;
}

impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, ty: TypeInfo) -> BoxFuture<'_, Result<TypeDescriptor>> {
        (**self).resolve(ty)
    }
}

/// Resolver using only the static mappings of a [`Scheme`]
///
/// Types registered by kind only cannot be addressed by this resolver
/// and are reported as not registered.
#[derive(Debug, Clone)]
pub struct SchemeResolver {
    scheme: Arc<Scheme>,
}

impl SchemeResolver {
    /// Resolver over a built scheme
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme }
    }
}

impl Resolve for SchemeResolver {
    fn resolve(&self, ty: TypeInfo) -> BoxFuture<'_, Result<TypeDescriptor>> {
        let res = self
            .scheme
            .get(&ty)
            .and_then(|reg| reg.mapping.clone())
            .ok_or(Error::TypeNotRegistered { type_name: ty.name() });
        Box::pin(future::ready(res))
    }
}
