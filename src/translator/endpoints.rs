//! Endpoint resolution policies.
//!
//! Only Service objects are visible to the translator, so a backend is reached
//! through one logical endpoint per Service port. How that endpoint is
//! addressed, and how Envoy discovers it, is a policy.

use std::fmt;

use crate::config::{EndpointPolicyKind, TranslatorConfig};
use crate::errors::{Error, Result};
use crate::model::{KubeObject, Service, ServicePort};
use crate::xds::cluster::{DiscoveryMode, EndpointConfig};

/// How Envoy discovers the endpoints of a backend cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointDiscovery {
    /// Endpoints arrive as a ClusterLoadAssignment over ADS
    Eds,
    /// Envoy resolves the endpoint address through DNS
    StrictDns,
}

pub trait EndpointPolicy: fmt::Debug + Send + Sync {
    fn discovery_type(&self) -> EndpointDiscovery;

    /// The single logical endpoint for `port` of `service`.
    fn endpoint(&self, service: &Service, port: &ServicePort) -> Result<EndpointConfig>;

    /// Cluster discovery mode carrying `endpoints` where the mode needs them inline.
    fn discovery_mode(&self, endpoints: Vec<EndpointConfig>) -> DiscoveryMode {
        match self.discovery_type() {
            EndpointDiscovery::Eds => DiscoveryMode::Eds,
            EndpointDiscovery::StrictDns => DiscoveryMode::StrictDns { endpoints },
        }
    }
}

/// Address backends by the Service cluster IP, delivered through EDS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterIpPolicy;

impl EndpointPolicy for ClusterIpPolicy {
    fn discovery_type(&self) -> EndpointDiscovery {
        EndpointDiscovery::Eds
    }

    fn endpoint(&self, service: &Service, port: &ServicePort) -> Result<EndpointConfig> {
        let address = service.cluster_ip().ok_or_else(|| {
            Error::invalid(
                service.object_ref(),
                "spec.clusterIP",
                "headless Service has no cluster IP (use the service-dns endpoint policy)",
            )
        })?;

        Ok(EndpointConfig { address: address.to_string(), port: u32::from(port.port) })
    }
}

/// Address backends by the Service DNS name, resolved by Envoy.
#[derive(Debug, Clone)]
pub struct ServiceDnsPolicy {
    pub cluster_domain: String,
}

impl EndpointPolicy for ServiceDnsPolicy {
    fn discovery_type(&self) -> EndpointDiscovery {
        EndpointDiscovery::StrictDns
    }

    fn endpoint(&self, service: &Service, port: &ServicePort) -> Result<EndpointConfig> {
        let key = service.key();
        Ok(EndpointConfig {
            address: format!("{}.{}.svc.{}", key.name, key.namespace, self.cluster_domain),
            port: u32::from(port.port),
        })
    }
}

/// The policy selected by the configuration.
pub fn policy_for(config: &TranslatorConfig) -> Box<dyn EndpointPolicy> {
    match config.endpoint_policy {
        EndpointPolicyKind::ClusterIp => Box::new(ClusterIpPolicy),
        EndpointPolicyKind::ServiceDns => {
            Box::new(ServiceDnsPolicy { cluster_domain: config.cluster_domain.clone() })
        }
    }
}
