//! # Resource Store
//!
//! Read-only view of the Kubernetes objects a translation consults. The
//! translator only ever sees a [`ResourceStore`]; whether it is backed by an
//! informer cache or by manifests on disk is a concern of the caller, which must
//! hand over a fully synced view.

pub mod manifest;
pub mod snapshot;

pub use manifest::{load_manifest_paths, parse_manifests, KubeResource};
pub use snapshot::Snapshot;

use crate::model::{Gateway, HttpRoute, Namespace, ReferenceGrant, Secret, Service};

/// Point-in-time lookup interface over the input objects.
///
/// Listing methods return objects in ascending (namespace, name) order so that
/// everything built from them is reproducible.
pub trait ResourceStore: Send + Sync {
    fn namespace(&self, name: &str) -> Option<&Namespace>;

    fn gateway(&self, namespace: &str, name: &str) -> Option<&Gateway>;

    /// Every HTTPRoute in every namespace.
    fn http_routes(&self) -> Vec<&HttpRoute>;

    fn http_routes_in(&self, namespace: &str) -> Vec<&HttpRoute>;

    fn service(&self, namespace: &str, name: &str) -> Option<&Service>;

    fn secret(&self, namespace: &str, name: &str) -> Option<&Secret>;

    /// ReferenceGrants living in `namespace`, i.e. grants for objects in it.
    fn reference_grants_in(&self, namespace: &str) -> Vec<&ReferenceGrant>;
}
