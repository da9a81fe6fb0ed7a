//! Aggregated xDS resource graph.
//!
//! [`XdsResources`] holds the typed resources produced for one Gateway, keyed
//! by kind and deduplicated by name. Encoding into `Any` payloads happens only
//! when the graph leaves the crate.

use envoy_types::pb::envoy::config::{
    cluster::v3::Cluster, endpoint::v3::ClusterLoadAssignment, listener::v3::Listener,
    route::v3::RouteConfiguration,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

use super::listener::encode_listener;

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

/// xDS resource kinds, in the order they are presented to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Listener,
    RouteConfiguration,
    Cluster,
    ClusterLoadAssignment,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Listener,
        ResourceType::RouteConfiguration,
        ResourceType::Cluster,
        ResourceType::ClusterLoadAssignment,
    ];

    pub fn type_url(&self) -> &'static str {
        match self {
            ResourceType::Listener => LISTENER_TYPE_URL,
            ResourceType::RouteConfiguration => ROUTE_TYPE_URL,
            ResourceType::Cluster => CLUSTER_TYPE_URL,
            ResourceType::ClusterLoadAssignment => ENDPOINT_TYPE_URL,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Listener => "Listener",
            ResourceType::RouteConfiguration => "RouteConfiguration",
            ResourceType::Cluster => "Cluster",
            ResourceType::ClusterLoadAssignment => "ClusterLoadAssignment",
        };
        write!(f, "{}", name)
    }
}

/// Wrapper for a built Envoy resource along with its name.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltResource {
    pub name: String,
    pub resource: Any,
}

impl BuiltResource {
    fn encode<M: Message>(name: &str, resource_type: ResourceType, message: &M) -> Self {
        Self::from_encoded(name, resource_type, message.encode_to_vec())
    }

    fn from_encoded(name: &str, resource_type: ResourceType, encoded: Vec<u8>) -> Self {
        debug!(
            resource_type = %resource_type,
            resource = %name,
            bytes = encoded.len(),
            "Encoded resource"
        );
        Self {
            name: name.to_string(),
            resource: Any { type_url: resource_type.type_url().to_string(), value: encoded },
        }
    }

    pub fn into_any(self) -> Any {
        self.resource
    }

    pub fn type_url(&self) -> &str {
        &self.resource.type_url
    }
}

/// Resource graph for a single Gateway.
///
/// Each kind keeps insertion order. Adding a resource whose name is already
/// present for that kind keeps the first instance and reports `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XdsResources {
    listeners: Vec<Listener>,
    route_configurations: Vec<RouteConfiguration>,
    clusters: Vec<Cluster>,
    load_assignments: Vec<ClusterLoadAssignment>,
    names: BTreeMap<ResourceType, HashSet<String>>,
}

impl XdsResources {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, resource_type: ResourceType, name: &str) -> bool {
        let fresh = self.names.entry(resource_type).or_default().insert(name.to_string());
        if !fresh {
            debug!(resource_type = %resource_type, resource = %name, "Skipping duplicate resource");
        }
        fresh
    }

    pub fn add_listener(&mut self, listener: Listener) -> bool {
        let fresh = self.claim(ResourceType::Listener, &listener.name);
        if fresh {
            self.listeners.push(listener);
        }
        fresh
    }

    pub fn add_route_configuration(&mut self, route_configuration: RouteConfiguration) -> bool {
        let fresh = self.claim(ResourceType::RouteConfiguration, &route_configuration.name);
        if fresh {
            self.route_configurations.push(route_configuration);
        }
        fresh
    }

    pub fn add_cluster(&mut self, cluster: Cluster) -> bool {
        let fresh = self.claim(ResourceType::Cluster, &cluster.name);
        if fresh {
            self.clusters.push(cluster);
        }
        fresh
    }

    pub fn add_load_assignment(&mut self, assignment: ClusterLoadAssignment) -> bool {
        let fresh = self.claim(ResourceType::ClusterLoadAssignment, &assignment.cluster_name);
        if fresh {
            self.load_assignments.push(assignment);
        }
        fresh
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn route_configurations(&self) -> &[RouteConfiguration] {
        &self.route_configurations
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn load_assignments(&self) -> &[ClusterLoadAssignment] {
        &self.load_assignments
    }

    pub fn contains(&self, resource_type: ResourceType, name: &str) -> bool {
        self.names.get(&resource_type).is_some_and(|names| names.contains(name))
    }

    /// Resource names of one kind, in insertion order.
    pub fn names(&self, resource_type: ResourceType) -> Vec<&str> {
        match resource_type {
            ResourceType::Listener => self.listeners.iter().map(|r| r.name.as_str()).collect(),
            ResourceType::RouteConfiguration => {
                self.route_configurations.iter().map(|r| r.name.as_str()).collect()
            }
            ResourceType::Cluster => self.clusters.iter().map(|r| r.name.as_str()).collect(),
            ResourceType::ClusterLoadAssignment => {
                self.load_assignments.iter().map(|r| r.cluster_name.as_str()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
            + self.route_configurations.len()
            + self.clusters.len()
            + self.load_assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode the resources of one kind.
    pub fn built(&self, resource_type: ResourceType) -> Vec<BuiltResource> {
        match resource_type {
            ResourceType::Listener => self
                .listeners
                .iter()
                .map(|r| BuiltResource::from_encoded(&r.name, resource_type, encode_listener(r)))
                .collect(),
            ResourceType::RouteConfiguration => self
                .route_configurations
                .iter()
                .map(|r| BuiltResource::encode(&r.name, resource_type, r))
                .collect(),
            ResourceType::Cluster => self
                .clusters
                .iter()
                .map(|r| BuiltResource::encode(&r.name, resource_type, r))
                .collect(),
            ResourceType::ClusterLoadAssignment => self
                .load_assignments
                .iter()
                .map(|r| BuiltResource::encode(&r.cluster_name, resource_type, r))
                .collect(),
        }
    }

    /// Encoded mapping from resource kind to its ordered resources.
    ///
    /// Every kind is present, possibly with an empty list.
    pub fn into_resource_map(self) -> BTreeMap<ResourceType, Vec<BuiltResource>> {
        ResourceType::ALL.iter().map(|kind| (*kind, self.built(*kind))).collect()
    }
}
