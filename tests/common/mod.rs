//! Common test utilities for all integration tests.
//!
//! Builds snapshots from YAML fixtures and pulls fields out of the generated
//! Envoy protobufs.

#![allow(dead_code)]

use envoy_types::pb::envoy::config::core::v3::{address::Address, socket_address::PortSpecifier};
use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::envoy::config::route::v3::{route::Action, route_action::ClusterSpecifier, Route};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::http_connection_manager::RouteSpecifier;
use gateway_xds::config::TranslatorConfig;
use gateway_xds::model::ObjectKey;
use gateway_xds::store::parse_manifests;
use gateway_xds::xds::listener::decode_http_connection_manager;
use gateway_xds::{Result, Snapshot, Translator, XdsResources};

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

/// Snapshot holding every object of every document.
pub fn snapshot(documents: &[&str]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (index, document) in documents.iter().enumerate() {
        for resource in parse_manifests(&format!("document-{}", index), document).expect("manifest") {
            snapshot.insert(resource);
        }
    }
    snapshot
}

pub fn translate(snapshot: &Snapshot, namespace: &str, gateway: &str) -> Result<XdsResources> {
    Translator::new(snapshot, TranslatorConfig::default())
        .translate_gateway(&ObjectKey::new(namespace, gateway))
}

pub fn listener_port(listener: &Listener) -> u32 {
    match listener.address.as_ref().and_then(|a| a.address.as_ref()) {
        Some(Address::SocketAddress(socket)) => match socket.port_specifier {
            Some(PortSpecifier::PortValue(port)) => port,
            _ => panic!("listener {} has no port value", listener.name),
        },
        _ => panic!("listener {} has no socket address", listener.name),
    }
}

pub fn rds_name(listener: &Listener) -> String {
    let hcm = decode_http_connection_manager(&listener.filter_chains[0])
        .expect("decode")
        .expect("http connection manager");
    match hcm.route_specifier {
        Some(RouteSpecifier::Rds(rds)) => rds.route_config_name,
        other => panic!("expected RDS, found {:?}", other),
    }
}

/// `(cluster, weight)` pairs and the declared total of a weighted-cluster route.
#[allow(deprecated)]
pub fn weighted_clusters(route: &Route) -> (Vec<(String, u32)>, Option<u32>) {
    match &route.action {
        Some(Action::Route(action)) => match &action.cluster_specifier {
            Some(ClusterSpecifier::WeightedClusters(weighted)) => (
                weighted
                    .clusters
                    .iter()
                    .map(|c| (c.name.clone(), c.weight.as_ref().map(|w| w.value).unwrap_or_default()))
                    .collect(),
                weighted.total_weight.as_ref().map(|w| w.value),
            ),
            other => panic!("expected weighted clusters, found {:?}", other),
        },
        other => panic!("expected route action, found {:?}", other),
    }
}

/// Names of all routes of a RouteConfiguration, in order.
pub fn route_names(resources: &XdsResources, route_config: &str) -> Vec<String> {
    resources
        .route_configurations()
        .iter()
        .find(|rc| rc.name == route_config)
        .map(|rc| {
            rc.virtual_hosts
                .iter()
                .flat_map(|vh| vh.routes.iter().map(|r| r.name.clone()))
                .collect()
        })
        .unwrap_or_default()
}
