//! Referential-integrity check over an assembled resource graph.
//!
//! A failure here means the translator emitted a dangling reference; it is
//! reported as [`Error::InconsistentOutput`](crate::Error::InconsistentOutput).

use envoy_types::pb::envoy::config::cluster::v3::cluster::{ClusterDiscoveryType, DiscoveryType};
use envoy_types::pb::envoy::config::route::v3::{route::Action, route_action::ClusterSpecifier};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::http_connection_manager::RouteSpecifier;

use super::listener::decode_http_connection_manager;
use super::resources::{ResourceType, XdsResources};
use crate::errors::{Error, Result};

/// Verify that every cross-resource reference resolves within `resources`.
///
/// * each Listener's RDS name names a RouteConfiguration
/// * each Route's clusters exist
/// * each EDS Cluster has a ClusterLoadAssignment, and every assignment has a Cluster
pub fn check_consistency(resources: &XdsResources) -> Result<()> {
    for listener in resources.listeners() {
        for chain in &listener.filter_chains {
            let Some(hcm) = decode_http_connection_manager(chain)? else {
                continue;
            };
            if let Some(RouteSpecifier::Rds(rds)) = &hcm.route_specifier {
                if !resources.contains(ResourceType::RouteConfiguration, &rds.route_config_name) {
                    return Err(Error::inconsistent(
                        ResourceType::Listener.to_string(),
                        &listener.name,
                        format!("references missing RouteConfiguration '{}'", rds.route_config_name),
                    ));
                }
            }
        }
    }

    for route_configuration in resources.route_configurations() {
        for virtual_host in &route_configuration.virtual_hosts {
            for route in &virtual_host.routes {
                for cluster in route_clusters(route.action.as_ref()) {
                    if !resources.contains(ResourceType::Cluster, cluster) {
                        return Err(Error::inconsistent(
                            "Route",
                            &route.name,
                            format!(
                                "in RouteConfiguration '{}' references missing Cluster '{}'",
                                route_configuration.name, cluster
                            ),
                        ));
                    }
                }
            }
        }
    }

    for cluster in resources.clusters() {
        let is_eds = cluster.cluster_discovery_type
            == Some(ClusterDiscoveryType::Type(DiscoveryType::Eds as i32));
        if !is_eds {
            continue;
        }
        let service_name = cluster
            .eds_cluster_config
            .as_ref()
            .map(|eds| eds.service_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(cluster.name.as_str());
        if !resources.contains(ResourceType::ClusterLoadAssignment, service_name) {
            return Err(Error::inconsistent(
                ResourceType::Cluster.to_string(),
                &cluster.name,
                format!("uses EDS but has no ClusterLoadAssignment '{}'", service_name),
            ));
        }
    }

    for assignment in resources.load_assignments() {
        if !resources.contains(ResourceType::Cluster, &assignment.cluster_name) {
            return Err(Error::inconsistent(
                ResourceType::ClusterLoadAssignment.to_string(),
                &assignment.cluster_name,
                "has no matching Cluster",
            ));
        }
    }

    Ok(())
}

#[allow(deprecated)]
fn route_clusters(action: Option<&Action>) -> Vec<&str> {
    match action {
        Some(Action::Route(route_action)) => match &route_action.cluster_specifier {
            Some(ClusterSpecifier::Cluster(name)) => vec![name.as_str()],
            Some(ClusterSpecifier::WeightedClusters(weighted)) => {
                weighted.clusters.iter().map(|c| c.name.as_str()).collect()
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
