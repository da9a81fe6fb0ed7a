//! Backend Services to Clusters and ClusterLoadAssignments.

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use std::collections::HashMap;
use tracing::debug;

use super::endpoints::EndpointPolicy;
use super::naming;
use super::reference::ensure_authorized;
use crate::config::TranslatorConfig;
use crate::errors::{Error, Result};
use crate::model::{
    BackendPort, GroupKind, HttpBackendRef, HttpRoute, KubeObject, ObjectRef, Service,
    ServicePort, CORE_GROUP,
};
use crate::store::ResourceStore;
use crate::xds::cluster::{ClusterConfig, LoadAssignmentConfig};

/// A Cluster together with the endpoint assignment delivered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltCluster {
    pub cluster: Cluster,
    pub load_assignment: ClusterLoadAssignment,
}

/// Builds each backend Cluster once, however many rules reference it.
#[derive(Debug)]
pub struct ClusterBuilder<'a> {
    config: &'a TranslatorConfig,
    policy: &'a dyn EndpointPolicy,
    built: Vec<BuiltCluster>,
    by_name: HashMap<String, usize>,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(config: &'a TranslatorConfig, policy: &'a dyn EndpointPolicy) -> Self {
        Self { config, policy, built: Vec::new(), by_name: HashMap::new() }
    }

    /// Name of the Cluster for `port` of `service`, building it on first use.
    pub fn cluster_for(&mut self, service: &Service, port: &ServicePort) -> Result<String> {
        let key = service.key();
        let name = naming::cluster_name(&key.namespace, &key.name, port.port);
        if self.by_name.contains_key(&name) {
            return Ok(name);
        }

        let endpoint = self.policy.endpoint(service, port)?;
        let load_assignment =
            LoadAssignmentConfig { cluster_name: name.clone(), endpoints: vec![endpoint.clone()] }
                .to_envoy_load_assignment()?;
        let cluster = ClusterConfig {
            name: name.clone(),
            discovery: self.policy.discovery_mode(vec![endpoint]),
            connect_timeout_seconds: self.config.connect_timeout_seconds,
        }
        .to_envoy_cluster()?;

        debug!(cluster = %name, service = %key, port = port.port, "Built backend cluster");

        self.by_name.insert(name.clone(), self.built.len());
        self.built.push(BuiltCluster { cluster, load_assignment });
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }

    /// Built clusters in first-reference order.
    pub fn into_clusters(self) -> Vec<BuiltCluster> {
        self.built
    }
}

/// Resolve one backendRef of `route` to a Cluster name.
///
/// Checks, in order: the backend kind, backend-level filters, cross-namespace
/// authorization, Service existence and the Service port.
pub fn resolve_backend<S: ResourceStore + ?Sized>(
    store: &S,
    clusters: &mut ClusterBuilder<'_>,
    route: &HttpRoute,
    backend: &HttpBackendRef,
    field: &str,
) -> Result<String> {
    let route_ref = route.object_ref();

    if backend.group() != CORE_GROUP || backend.kind() != "Service" {
        return Err(Error::unsupported(
            route_ref,
            field,
            format!(
                "backend kind {} is not supported, only core Service",
                GroupKind::new(backend.group(), backend.kind())
            ),
        ));
    }

    if let Some(filter) = backend.filters.first() {
        return Err(Error::unsupported(
            route_ref,
            format!("{}.filters[0]", field),
            format!("backend-level filter {} is not supported", filter.filter_type),
        ));
    }

    let namespace = backend.namespace.as_deref().unwrap_or(&route_ref.namespace);
    ensure_authorized(
        store,
        &route_ref,
        &GroupKind::http_route(),
        &GroupKind::service(),
        namespace,
        &backend.name,
        field,
    )?;

    let service = store.service(namespace, &backend.name).ok_or_else(|| {
        Error::not_found_from(
            ObjectRef::new("Service", namespace, backend.name.clone()),
            format!("{} {}", route_ref, field),
        )
    })?;

    let port = match &backend.port {
        None => {
            return Err(Error::invalid(
                route_ref,
                format!("{}.port", field),
                "port is required for Service backends",
            ))
        }
        Some(BackendPort::Number(number)) => service.port_by_number(*number),
        Some(BackendPort::Name(name)) => service.port_by_name(name),
    };

    let port = port.ok_or_else(|| {
        Error::invalid(
            route_ref.clone(),
            format!("{}.port", field),
            format!(
                "Service {} has no port {}",
                service.key(),
                backend.port.as_ref().map(ToString::to_string).unwrap_or_default()
            ),
        )
    })?;

    clusters.cluster_for(service, port)
}
