//! Deterministic names for derived resources.
//!
//! Names are built only from the identity of the source objects, so two runs
//! over the same input (or two independent translators) agree on them.
//!
//! | Resource | Name |
//! |---|---|
//! | Listener | `<gateway-namespace>/<gateway-name>/<listener-name>` |
//! | RouteConfiguration | same as its Listener |
//! | VirtualHost | `<route-configuration>/<hostnames joined by ','>` |
//! | Route | `<route-namespace>/<route-name>/rule/<i>/match/<j>` |
//! | Cluster, ClusterLoadAssignment | `<service-namespace>/<service-name>/<port>` |

use crate::model::ObjectKey;

pub fn listener_name(gateway: &ObjectKey, listener: &str) -> String {
    format!("{}/{}/{}", gateway.namespace, gateway.name, listener)
}

pub fn route_config_name(gateway: &ObjectKey, listener: &str) -> String {
    listener_name(gateway, listener)
}

pub fn virtual_host_name(route_config: &str, hostnames: &[String]) -> String {
    format!("{}/{}", route_config, hostnames.join(","))
}

pub fn route_name(route: &ObjectKey, rule_index: usize, match_index: usize) -> String {
    format!("{}/{}/rule/{}/match/{}", route.namespace, route.name, rule_index, match_index)
}

/// Cluster name for a backend Service port, always the numeric port.
pub fn cluster_name(namespace: &str, service: &str, port: u16) -> String {
    format!("{}/{}/{}", namespace, service, port)
}

/// Envoy stat prefixes may not contain `/`.
pub fn stat_prefix(name: &str) -> String {
    name.replace('/', "_")
}
