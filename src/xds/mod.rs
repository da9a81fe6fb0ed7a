//! # Envoy xDS Resources
//!
//! Intermediate configuration structs for Listeners, RouteConfigurations and
//! Clusters with their `to_envoy_*` conversions, the per-Gateway resource
//! aggregate, and the referential-integrity check run over it.

pub mod cluster;
pub mod consistency;
pub mod listener;
pub mod resources;
pub mod route;

pub use consistency::check_consistency;
pub use resources::{
    BuiltResource, ResourceType, XdsResources, CLUSTER_TYPE_URL, ENDPOINT_TYPE_URL,
    LISTENER_TYPE_URL, ROUTE_TYPE_URL,
};
