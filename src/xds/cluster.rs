//! Cluster configuration using envoy-types
//!
//! Intermediate representation of upstream Clusters and their load
//! assignments, converted to the envoy-types protobuf definitions.

use envoy_types::pb::envoy::config::{
    cluster::v3::{
        cluster::{ClusterDiscoveryType, DiscoveryType, EdsClusterConfig, LbPolicy},
        Cluster,
    },
    core::v3::{address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress},
    endpoint::v3::{
        lb_endpoint::HostIdentifier, ClusterLoadAssignment, Endpoint, LbEndpoint,
        LocalityLbEndpoints,
    },
};
use envoy_types::pb::google::protobuf::{Duration, UInt32Value};
use serde::Serialize;
use validator::Validate;

use super::listener::ads_config_source;

/// Upstream cluster description
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ClusterConfig {
    #[validate(length(min = 1, message = "Cluster name cannot be empty"))]
    pub name: String,

    pub discovery: DiscoveryMode,

    #[validate(range(
        min = 1,
        max = 300,
        message = "Connect timeout must be between 1 and 300 seconds"
    ))]
    pub connect_timeout_seconds: u64,
}

/// How Envoy learns the members of a cluster
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryMode {
    /// Endpoints are delivered as a ClusterLoadAssignment over ADS
    Eds,
    /// Endpoints are hostnames resolved by Envoy itself
    StrictDns { endpoints: Vec<EndpointConfig> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct EndpointConfig {
    #[validate(length(min = 1, message = "Endpoint address cannot be empty"))]
    pub address: String,

    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u32,
}

/// Endpoint set delivered for a cluster.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct LoadAssignmentConfig {
    pub cluster_name: String,

    #[validate(length(min = 1, message = "At least one endpoint is required"))]
    #[validate(nested)]
    pub endpoints: Vec<EndpointConfig>,
}

impl ClusterConfig {
    /// Validate the cluster configuration
    pub fn validate_config(&self) -> Result<(), crate::Error> {
        self.validate().map_err(|e| {
            crate::Error::inconsistent("Cluster", &self.name, format!("failed validation: {}", e))
        })?;

        if let DiscoveryMode::StrictDns { endpoints } = &self.discovery {
            LoadAssignmentConfig { cluster_name: self.name.clone(), endpoints: endpoints.clone() }
                .validate_config()?;
        }

        Ok(())
    }

    /// Convert ClusterConfig to envoy-types Cluster
    pub fn to_envoy_cluster(&self) -> Result<Cluster, crate::Error> {
        self.validate_config()?;

        let mut cluster = Cluster {
            name: self.name.clone(),
            lb_policy: LbPolicy::RoundRobin as i32,
            connect_timeout: Some(Duration { seconds: self.connect_timeout_seconds as i64, nanos: 0 }),
            ..Default::default()
        };

        match &self.discovery {
            DiscoveryMode::Eds => {
                cluster.cluster_discovery_type =
                    Some(ClusterDiscoveryType::Type(DiscoveryType::Eds as i32));
                cluster.eds_cluster_config = Some(EdsClusterConfig {
                    eds_config: Some(ads_config_source()),
                    service_name: self.name.clone(),
                });
            }
            DiscoveryMode::StrictDns { endpoints } => {
                cluster.cluster_discovery_type =
                    Some(ClusterDiscoveryType::Type(DiscoveryType::StrictDns as i32));
                cluster.load_assignment = Some(
                    LoadAssignmentConfig {
                        cluster_name: self.name.clone(),
                        endpoints: endpoints.clone(),
                    }
                    .to_envoy_load_assignment()?,
                );
            }
        }

        Ok(cluster)
    }
}

impl LoadAssignmentConfig {
    pub fn validate_config(&self) -> Result<(), crate::Error> {
        self.validate().map_err(|e| {
            crate::Error::inconsistent(
                "ClusterLoadAssignment",
                &self.cluster_name,
                format!("failed validation: {}", e),
            )
        })
    }

    /// Convert LoadAssignmentConfig to envoy-types ClusterLoadAssignment
    pub fn to_envoy_load_assignment(&self) -> Result<ClusterLoadAssignment, crate::Error> {
        self.validate_config()?;

        let lb_endpoints: Vec<LbEndpoint> =
            self.endpoints.iter().map(EndpointConfig::to_envoy_lb_endpoint).collect();

        Ok(ClusterLoadAssignment {
            cluster_name: self.cluster_name.clone(),
            endpoints: vec![LocalityLbEndpoints { lb_endpoints, ..Default::default() }],
            ..Default::default()
        })
    }
}

impl EndpointConfig {
    /// Convert EndpointConfig to envoy-types LbEndpoint
    fn to_envoy_lb_endpoint(&self) -> LbEndpoint {
        let socket_address = SocketAddress {
            address: self.address.clone(),
            port_specifier: Some(PortSpecifier::PortValue(self.port)),
            ..Default::default()
        };

        let endpoint = Endpoint {
            address: Some(Address { address: Some(AddressType::SocketAddress(socket_address)) }),
            ..Default::default()
        };

        LbEndpoint {
            host_identifier: Some(HostIdentifier::Endpoint(endpoint)),
            load_balancing_weight: Some(UInt32Value { value: 1 }),
            ..Default::default()
        }
    }
}
