//! In-memory [`ResourceStore`] over a fixed set of objects.

use std::collections::BTreeMap;
use tracing::warn;

use super::manifest::KubeResource;
use super::ResourceStore;
use crate::model::{
    Gateway, HttpRoute, KubeObject, Namespace, ObjectKey, ReferenceGrant, Secret, Service,
};

/// Immutable-after-construction snapshot, keyed by [`ObjectKey`].
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    namespaces: BTreeMap<String, Namespace>,
    gateways: BTreeMap<ObjectKey, Gateway>,
    http_routes: BTreeMap<ObjectKey, HttpRoute>,
    services: BTreeMap<ObjectKey, Service>,
    secrets: BTreeMap<ObjectKey, Secret>,
    reference_grants: BTreeMap<ObjectKey, ReferenceGrant>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: impl IntoIterator<Item = KubeResource>) -> Self {
        let mut snapshot = Self::new();
        for resource in resources {
            snapshot.insert(resource);
        }
        snapshot
    }

    /// Insert an object, replacing an earlier one with the same identity.
    pub fn insert(&mut self, resource: KubeResource) {
        match resource {
            KubeResource::Namespace(namespace) => {
                let name = namespace.metadata.name.clone();
                if self.namespaces.insert(name.clone(), namespace).is_some() {
                    warn!(kind = "Namespace", name = %name, "Duplicate object replaced");
                }
            }
            KubeResource::Gateway(gateway) => insert_keyed(&mut self.gateways, gateway),
            KubeResource::HttpRoute(route) => insert_keyed(&mut self.http_routes, route),
            KubeResource::Service(service) => insert_keyed(&mut self.services, service),
            KubeResource::Secret(secret) => insert_keyed(&mut self.secrets, secret),
            KubeResource::ReferenceGrant(grant) => insert_keyed(&mut self.reference_grants, grant),
        }
    }

    pub fn with(mut self, resource: impl Into<KubeResource>) -> Self {
        self.insert(resource.into());
        self
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
            + self.gateways.len()
            + self.http_routes.len()
            + self.services.len()
            + self.secrets.len()
            + self.reference_grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_keyed<T: KubeObject>(objects: &mut BTreeMap<ObjectKey, T>, object: T) {
    let key = object.key();
    if objects.insert(key.clone(), object).is_some() {
        warn!(kind = T::KIND, object = %key, "Duplicate object replaced");
    }
}

fn in_namespace<'a, T>(objects: &'a BTreeMap<ObjectKey, T>, namespace: &str) -> Vec<&'a T> {
    objects.iter().filter(|(key, _)| key.namespace == namespace).map(|(_, object)| object).collect()
}

impl ResourceStore for Snapshot {
    fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    fn gateway(&self, namespace: &str, name: &str) -> Option<&Gateway> {
        self.gateways.get(&ObjectKey::new(namespace, name))
    }

    fn http_routes(&self) -> Vec<&HttpRoute> {
        self.http_routes.values().collect()
    }

    fn http_routes_in(&self, namespace: &str) -> Vec<&HttpRoute> {
        in_namespace(&self.http_routes, namespace)
    }

    fn service(&self, namespace: &str, name: &str) -> Option<&Service> {
        self.services.get(&ObjectKey::new(namespace, name))
    }

    fn secret(&self, namespace: &str, name: &str) -> Option<&Secret> {
        self.secrets.get(&ObjectKey::new(namespace, name))
    }

    fn reference_grants_in(&self, namespace: &str) -> Vec<&ReferenceGrant> {
        in_namespace(&self.reference_grants, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpRouteSpec, ObjectMeta};

    fn route(namespace: &str, name: &str) -> HttpRoute {
        HttpRoute { metadata: ObjectMeta::new(namespace, name), spec: HttpRouteSpec::default() }
    }

    #[test]
    fn routes_are_listed_in_namespace_then_name_order() {
        let snapshot = Snapshot::new()
            .with(route("b", "a"))
            .with(route("a", "z"))
            .with(route("a", "b"));

        let names: Vec<String> =
            snapshot.http_routes().iter().map(|r| r.key().to_string()).collect();
        assert_eq!(names, vec!["a/b", "a/z", "b/a"]);

        let in_a: Vec<&str> =
            snapshot.http_routes_in("a").iter().map(|r| r.metadata.name.as_str()).collect();
        assert_eq!(in_a, vec!["b", "z"]);
    }

    #[test]
    fn later_duplicates_replace_earlier_ones() {
        let mut second = route("a", "r");
        second.spec.hostnames = vec!["example.com".into()];

        let snapshot = Snapshot::new().with(route("a", "r")).with(second);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.http_routes()[0].spec.hostnames, vec!["example.com"]);
    }
}
