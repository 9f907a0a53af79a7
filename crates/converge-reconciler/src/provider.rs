use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use converge_core::{Attributes, ObservedResource, ResourceKind, ResourceSpec, ResourceStatus};

use crate::error::ProviderError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a provider hands back after accepting a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: String,
    pub status: ResourceStatus,
}

/// What a provider hands back after accepting an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReceipt {
    pub status: ResourceStatus,
    /// `None` when the provider applies a delta all-or-nothing. Otherwise the
    /// keys it actually applied.
    pub accepted: Option<BTreeSet<String>>,
}

impl ApplyReceipt {
    pub fn atomic(status: ResourceStatus) -> Self {
        Self {
            status,
            accepted: None,
        }
    }

    pub fn partial(status: ResourceStatus, accepted: impl IntoIterator<Item = String>) -> Self {
        Self {
            status,
            accepted: Some(accepted.into_iter().collect()),
        }
    }

    /// Delta keys the provider did not apply. Empty for atomic receipts.
    pub fn missing<'a>(&self, delta: &'a Attributes) -> Vec<&'a str> {
        match &self.accepted {
            None => Vec::new(),
            Some(accepted) => delta
                .keys()
                .filter(|k| !accepted.contains(k.as_str()))
                .map(String::as_str)
                .collect(),
        }
    }
}

/// The boundary between the engine and whatever owns real resources.
///
/// One adapter per backend. Vendor request/response shapes stay inside the
/// adapter; the engine only sees kinds, identities and attribute maps.
///
/// Methods return boxed futures for dyn compatibility.
pub trait ResourceProvider: Send + Sync {
    /// Every resource matching `identity`. Empty = not found. The engine
    /// picks among multiple matches, so order does not matter here.
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>>;

    /// Create the resource described by `spec`.
    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>>;

    /// Change the listed attributes on an existing resource.
    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>>;

    /// Tear the resource down.
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>>;
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for Arc<P> {
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>> {
        (**self).find(kind, identity)
    }

    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>> {
        (**self).create(spec)
    }

    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>> {
        (**self).apply(id, delta)
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        (**self).delete(id)
    }
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for Box<P> {
    fn find<'a>(
        &'a self,
        kind: ResourceKind,
        identity: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ObservedResource>, ProviderError>> {
        (**self).find(kind, identity)
    }

    fn create<'a>(&'a self, spec: &'a ResourceSpec) -> BoxFuture<'a, Result<Created, ProviderError>> {
        (**self).create(spec)
    }

    fn apply<'a>(
        &'a self,
        id: &'a str,
        delta: &'a Attributes,
    ) -> BoxFuture<'a, Result<ApplyReceipt, ProviderError>> {
        (**self).apply(id, delta)
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ProviderError>> {
        (**self).delete(id)
    }
}
