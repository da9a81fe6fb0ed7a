//! # Input Model
//!
//! Serde representation of the Kubernetes objects the translator reads. Field
//! names follow the Gateway API v1 and core v1 JSON schemas, so manifests and
//! API server responses deserialize directly; fields the translator never
//! reads are ignored.

pub mod core;
pub mod gateway;
pub mod http_route;
pub mod meta;
pub mod reference_grant;

pub use self::core::{Namespace, Secret, Service, ServicePort, ServiceSpec};
pub use gateway::{Gateway, GatewaySpec, Listener, TlsMode};
pub use http_route::{BackendPort, HttpBackendRef, HttpRoute, HttpRouteRule, HttpRouteSpec};
pub use meta::{
    GroupKind, KubeObject, ObjectKey, ObjectMeta, ObjectRef, CORE_GROUP, DEFAULT_NAMESPACE,
    GATEWAY_API_GROUP,
};
pub use reference_grant::{ReferenceGrant, ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo};
