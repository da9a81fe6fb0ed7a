//! # Gateway Translator
//!
//! Compiles one Gateway, and the HTTPRoutes attached to it, into an Envoy
//! resource graph. Translation is synchronous and all-or-nothing: the first
//! error aborts the Gateway and no partial graph is returned.
//!
//! - [`reference`] authorizes cross-namespace references against ReferenceGrants
//! - [`listener`] builds one Listener per Gateway listener
//! - [`route`] builds the RouteConfiguration of each listener
//! - [`cluster`] materializes each backend Cluster once
//! - [`Translator`] drives the builders and aggregates their output

pub mod cluster;
pub mod endpoints;
pub mod listener;
pub mod naming;
pub mod reference;
pub mod route;

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::config::TranslatorConfig;
use crate::errors::{Error, Result};
use crate::model::{KubeObject, ObjectKey, ObjectRef};
use crate::store::ResourceStore;
use crate::xds::{check_consistency, XdsResources};

pub use endpoints::{policy_for, ClusterIpPolicy, EndpointDiscovery, EndpointPolicy, ServiceDnsPolicy};
pub use reference::{authorize, CrossNamespaceRef};
pub use route::intersect_hostnames;

use self::cluster::ClusterBuilder;

/// Translates Gateways read from a [`ResourceStore`].
#[derive(Debug)]
pub struct Translator<'a, S: ResourceStore + ?Sized> {
    store: &'a S,
    config: TranslatorConfig,
    policy: Box<dyn EndpointPolicy>,
}

impl<'a, S: ResourceStore + ?Sized> Translator<'a, S> {
    /// Create a translator using the endpoint policy selected by `config`.
    pub fn new(store: &'a S, config: TranslatorConfig) -> Self {
        let policy = policy_for(&config);
        Self { store, config, policy }
    }

    /// Replace the endpoint resolution policy.
    pub fn with_endpoint_policy(mut self, policy: Box<dyn EndpointPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate the Gateway identified by `gateway` into a consistent resource graph.
    pub fn translate_gateway(&self, gateway: &ObjectKey) -> Result<XdsResources> {
        let _span = crate::translate_span!(gateway).entered();

        self.config.validate_config()?;

        let gateway = self.store.gateway(&gateway.namespace, &gateway.name).ok_or_else(|| {
            Error::not_found(ObjectRef::new("Gateway", &gateway.namespace, &gateway.name))
        })?;
        let gateway_key = gateway.key();

        check_listeners(gateway)?;

        let mut clusters = ClusterBuilder::new(&self.config, self.policy.as_ref());
        let mut resources = XdsResources::new();

        for (index, listener) in gateway.spec.listeners.iter().enumerate() {
            let listener_name = self::naming::listener_name(&gateway_key, &listener.name);
            let _span = crate::listener_span!(listener_name, port = listener.port).entered();

            let listener_config =
                self::listener::build_listener(self.store, &self.config, gateway, index, listener)?;
            let route_config = self::route::build_route_configuration(
                self.store,
                &mut clusters,
                gateway,
                listener,
            )?;

            resources.add_listener(listener_config.to_envoy_listener()?);
            resources.add_route_configuration(route_config.to_envoy_route_configuration()?);
        }

        for built in clusters.into_clusters() {
            resources.add_cluster(built.cluster);
            resources.add_load_assignment(built.load_assignment);
        }

        check_consistency(&resources)?;

        info!(
            gateway = %gateway_key,
            listeners = resources.listeners().len(),
            route_configurations = resources.route_configurations().len(),
            clusters = resources.clusters().len(),
            load_assignments = resources.load_assignments().len(),
            "Translated Gateway"
        );

        Ok(resources)
    }
}

/// Translate one Gateway with a policy chosen from `config`.
pub fn translate_gateway<S: ResourceStore + ?Sized>(
    store: &S,
    gateway: &ObjectKey,
    config: &TranslatorConfig,
) -> Result<XdsResources> {
    Translator::new(store, config.clone()).translate_gateway(gateway)
}

/// Listener names must be unique within a Gateway; shared ports are kept as
/// separate Listeners and only reported.
fn check_listeners(gateway: &crate::model::Gateway) -> Result<()> {
    let mut names = HashSet::new();
    let mut ports: HashMap<u16, &str> = HashMap::new();

    for (index, listener) in gateway.spec.listeners.iter().enumerate() {
        if !names.insert(listener.name.as_str()) {
            return Err(Error::invalid(
                gateway.object_ref(),
                format!("spec.listeners[{}].name", index),
                format!("listener name '{}' is used more than once", listener.name),
            ));
        }

        if let Some(first) = ports.insert(listener.port, &listener.name) {
            warn!(
                gateway = %gateway.key(),
                port = listener.port,
                first = %first,
                second = %listener.name,
                "Listeners share a port; the emitted Listeners will collide on bind"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{parse_manifests, Snapshot};
    use crate::xds::ResourceType;

    const MANIFESTS: &str = r#"
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata: { name: g1, namespace: ns1 }
spec:
  gatewayClassName: envoy
  listeners:
    - { name: http, port: 80, protocol: HTTP }
    - { name: admin, port: 8080, protocol: HTTP, hostname: admin.example.com }
---
apiVersion: gateway.networking.k8s.io/v1
kind: HTTPRoute
metadata: { name: r1, namespace: ns1 }
spec:
  parentRefs: [{ name: g1 }]
  hostnames: [example.com, admin.example.com]
  rules:
    - backendRefs: [{ name: svc1, port: 8080 }]
---
apiVersion: v1
kind: Service
metadata: { name: svc1, namespace: ns1 }
spec:
  clusterIP: 10.0.0.1
  ports: [{ port: 8080 }]
"#;

    fn snapshot() -> Snapshot {
        Snapshot::from_resources(parse_manifests("test", MANIFESTS).expect("manifests"))
    }

    #[test]
    fn test_translate_gateway() {
        let store = snapshot();
        let resources = Translator::new(&store, TranslatorConfig::default())
            .translate_gateway(&ObjectKey::new("ns1", "g1"))
            .expect("translation");

        assert_eq!(resources.names(ResourceType::Listener), vec!["ns1/g1/http", "ns1/g1/admin"]);
        assert_eq!(
            resources.names(ResourceType::RouteConfiguration),
            vec!["ns1/g1/http", "ns1/g1/admin"]
        );
        // one backend shared by both listeners
        assert_eq!(resources.names(ResourceType::Cluster), vec!["ns1/svc1/8080"]);
        assert_eq!(resources.names(ResourceType::ClusterLoadAssignment), vec!["ns1/svc1/8080"]);

        let admin = &resources.route_configurations()[1];
        assert_eq!(admin.virtual_hosts[0].domains, vec!["admin.example.com"]);
    }

    #[test]
    fn test_missing_gateway() {
        let store = snapshot();
        let error = translate_gateway(&store, &ObjectKey::new("ns1", "absent"), &TranslatorConfig::default())
            .unwrap_err();
        assert_eq!(error.category(), "not-found");
        assert_eq!(error.to_string(), "Gateway ns1/absent not found");
    }

    #[test]
    fn test_duplicate_listener_names_are_invalid() {
        let gateway: crate::model::Gateway = serde_yaml::from_str(
            "metadata: { name: g1, namespace: ns1 }\nspec:\n  listeners:\n    - { name: http, port: 80, protocol: HTTP }\n    - { name: http, port: 81, protocol: HTTP }\n",
        )
        .expect("gateway");
        let store = Snapshot::new().with(gateway);

        let error = translate_gateway(&store, &ObjectKey::new("ns1", "g1"), &TranslatorConfig::default())
            .unwrap_err();
        assert_eq!(error.category(), "invalid-input");
        assert!(error.to_string().contains("spec.listeners[1].name"));
    }

    #[test]
    fn test_service_dns_policy_emits_strict_dns_clusters() {
        let store = snapshot();
        let resources = Translator::new(&store, TranslatorConfig::default())
            .with_endpoint_policy(Box::new(ServiceDnsPolicy { cluster_domain: "cluster.local".into() }))
            .translate_gateway(&ObjectKey::new("ns1", "g1"))
            .expect("translation");

        let cluster = &resources.clusters()[0];
        assert!(cluster.eds_cluster_config.is_none());
        assert!(cluster.load_assignment.is_some());
    }
}
