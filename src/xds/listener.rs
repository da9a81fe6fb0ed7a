//! Listener configuration using envoy-types
//!
//! Intermediate representation of Envoy Listeners and its conversion to the
//! envoy-types protobuf definitions. Every filter chain terminates in an HTTP
//! connection manager that pulls its RouteConfiguration over ADS.

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, config_source::ConfigSourceSpecifier,
    data_source::Specifier as DataSourceSpecifier, socket_address::PortSpecifier,
    transport_socket::ConfigType as TransportSocketConfigType, Address, AggregatedConfigSource,
    ApiVersion, ConfigSource, DataSource, Metadata, SocketAddress, TransportSocket,
};
use envoy_types::pb::envoy::config::listener::v3::{
    filter::ConfigType as FilterConfigType, listener_filter::ConfigType as ListenerFilterConfigType,
    Filter, FilterChain, FilterChainMatch, Listener, ListenerFilter,
};
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::listener::tls_inspector::v3::TlsInspector;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{CodecType, RouteSpecifier},
    http_filter::ConfigType as HttpFilterConfigType,
    HttpConnectionManager, HttpFilter, Rds,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    CommonTlsContext, DownstreamTlsContext, TlsCertificate,
};
use envoy_types::pb::google::protobuf::{
    value::Kind as ValueKind, Any as EnvoyAny, Struct as ProstStruct, Value as ProstValue,
};
use prost::Message;
use std::collections::BTreeMap;
use std::fmt;

/// Envoy's canonical HTTP connection manager filter name
pub const HTTP_CONNECTION_MANAGER_FILTER_NAME: &str =
    "envoy.filters.network.http_connection_manager";
pub const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

/// Envoy's canonical router filter name
pub const ROUTER_FILTER_NAME: &str = "envoy.filters.http.router";
const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

pub const TLS_INSPECTOR_FILTER_NAME: &str = "envoy.filters.listener.tls_inspector";
const TLS_INSPECTOR_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.listener.tls_inspector.v3.TlsInspector";

const TLS_TRANSPORT_SOCKET_NAME: &str = "envoy.transport_sockets.tls";
const DOWNSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

/// Filter metadata namespace carrying the Gateway origin of a Listener.
pub const GATEWAY_METADATA_NAMESPACE: &str = "gateway.networking.k8s.io";

#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    pub name: String,
    pub address: String,
    pub port: u32,
    pub filter_chains: Vec<FilterChainConfig>,
    /// String values published under [`GATEWAY_METADATA_NAMESPACE`]
    pub metadata: BTreeMap<String, String>,
    /// Adds the TLS inspector so filter chains can match on SNI
    pub tls_inspector: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterChainConfig {
    pub name: Option<String>,
    /// SNI values the chain is selected for; empty matches everything
    pub server_names: Vec<String>,
    pub route_config_name: String,
    pub stat_prefix: String,
    pub tls_context: Option<TlsContextConfig>,
}

/// Downstream TLS termination with inline certificate material.
#[derive(Clone, PartialEq)]
pub struct TlsContextConfig {
    pub certificates: Vec<TlsCertificateConfig>,
}

#[derive(Clone, PartialEq)]
pub struct TlsCertificateConfig {
    pub certificate_chain: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl fmt::Debug for TlsContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContextConfig")
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

impl fmt::Debug for TlsCertificateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCertificateConfig")
            .field("certificate_chain_bytes", &self.certificate_chain.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ListenerConfig {
    /// Convert ListenerConfig to envoy-types Listener
    pub fn to_envoy_listener(&self) -> Result<Listener, crate::Error> {
        if self.filter_chains.is_empty() {
            return Err(crate::Error::inconsistent("Listener", &self.name, "has no filter chains"));
        }

        let socket_address = SocketAddress {
            address: self.address.clone(),
            port_specifier: Some(PortSpecifier::PortValue(self.port)),
            ..Default::default()
        };

        let address = Address { address: Some(AddressType::SocketAddress(socket_address)) };

        let filter_chains: Vec<FilterChain> =
            self.filter_chains.iter().map(|fc| fc.to_envoy_filter_chain()).collect();

        let listener_filters = if self.tls_inspector {
            vec![ListenerFilter {
                name: TLS_INSPECTOR_FILTER_NAME.to_string(),
                config_type: Some(ListenerFilterConfigType::TypedConfig(EnvoyAny {
                    type_url: TLS_INSPECTOR_TYPE_URL.to_string(),
                    value: TlsInspector::default().encode_to_vec(),
                })),
                ..Default::default()
            }]
        } else {
            Vec::new()
        };

        let metadata = (!self.metadata.is_empty()).then(|| Metadata {
            filter_metadata: [(GATEWAY_METADATA_NAMESPACE.to_string(), string_struct(&self.metadata))]
                .into_iter()
                .collect(),
            ..Default::default()
        });

        Ok(Listener {
            name: self.name.clone(),
            address: Some(address),
            filter_chains,
            listener_filters,
            metadata,
            ..Default::default()
        })
    }
}

fn string_struct(values: &BTreeMap<String, String>) -> ProstStruct {
    ProstStruct {
        fields: values
            .iter()
            .map(|(key, value)| {
                (key.clone(), ProstValue { kind: Some(ValueKind::StringValue(value.clone())) })
            })
            .collect(),
    }
}

/// Field number of `metadata` in `envoy.config.listener.v3.Listener`.
const LISTENER_METADATA_TAG: u32 = 6;

/// `envoy.config.core.v3.Metadata` with its maps in key order.
#[derive(Clone, PartialEq, Message)]
struct SortedMetadata {
    #[prost(btree_map = "string, message", tag = "1")]
    filter_metadata: BTreeMap<String, SortedStruct>,
    #[prost(btree_map = "string, message", tag = "2")]
    typed_filter_metadata: BTreeMap<String, EnvoyAny>,
}

/// `google.protobuf.Struct` with its fields in key order.
#[derive(Clone, PartialEq, Message)]
struct SortedStruct {
    #[prost(btree_map = "string, message", tag = "1")]
    fields: BTreeMap<String, ProstValue>,
}

impl From<&Metadata> for SortedMetadata {
    fn from(metadata: &Metadata) -> Self {
        Self {
            filter_metadata: metadata
                .filter_metadata
                .iter()
                .map(|(key, value)| {
                    let fields = value.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    (key.clone(), SortedStruct { fields })
                })
                .collect(),
            typed_filter_metadata: metadata
                .typed_filter_metadata
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Encode a Listener with stable bytes.
///
/// prost writes `Metadata` maps in hash order, so the metadata field is
/// appended separately with sorted keys. Field order does not matter to
/// protobuf decoders.
pub fn encode_listener(listener: &Listener) -> Vec<u8> {
    let Some(metadata) = &listener.metadata else {
        return listener.encode_to_vec();
    };

    let mut buf = Listener { metadata: None, ..listener.clone() }.encode_to_vec();
    prost::encoding::message::encode(LISTENER_METADATA_TAG, &SortedMetadata::from(metadata), &mut buf);
    buf
}

impl FilterChainConfig {
    /// Convert FilterChainConfig to envoy-types FilterChain
    fn to_envoy_filter_chain(&self) -> FilterChain {
        let filter_chain_match = (!self.server_names.is_empty()).then(|| FilterChainMatch {
            server_names: self.server_names.clone(),
            ..Default::default()
        });

        FilterChain {
            name: self.name.clone().unwrap_or_default(),
            filter_chain_match,
            filters: vec![self.http_connection_manager_filter()],
            transport_socket: self.tls_context.as_ref().map(build_transport_socket),
            ..Default::default()
        }
    }

    fn http_connection_manager_filter(&self) -> Filter {
        let rds = Rds {
            route_config_name: self.route_config_name.clone(),
            config_source: Some(ads_config_source()),
        };

        let hcm = HttpConnectionManager {
            route_specifier: Some(RouteSpecifier::Rds(rds)),
            codec_type: CodecType::Auto as i32,
            stat_prefix: self.stat_prefix.clone(),
            http_filters: vec![router_filter()],
            ..Default::default()
        };

        Filter {
            name: HTTP_CONNECTION_MANAGER_FILTER_NAME.to_string(),
            config_type: Some(FilterConfigType::TypedConfig(EnvoyAny {
                type_url: HTTP_CONNECTION_MANAGER_TYPE_URL.to_string(),
                value: hcm.encode_to_vec(),
            })),
        }
    }
}

/// Config source pointing back at the aggregated (ADS) stream.
pub fn ads_config_source() -> ConfigSource {
    ConfigSource {
        resource_api_version: ApiVersion::V3 as i32,
        config_source_specifier: Some(ConfigSourceSpecifier::Ads(AggregatedConfigSource::default())),
        ..Default::default()
    }
}

fn router_filter() -> HttpFilter {
    HttpFilter {
        name: ROUTER_FILTER_NAME.to_string(),
        is_optional: false,
        disabled: false,
        config_type: Some(HttpFilterConfigType::TypedConfig(EnvoyAny {
            type_url: ROUTER_TYPE_URL.to_string(),
            value: RouterFilter::default().encode_to_vec(),
        })),
    }
}

fn build_transport_socket(cfg: &TlsContextConfig) -> TransportSocket {
    let common = CommonTlsContext {
        tls_certificates: cfg
            .certificates
            .iter()
            .map(|cert| TlsCertificate {
                certificate_chain: Some(inline_bytes(&cert.certificate_chain)),
                private_key: Some(inline_bytes(&cert.private_key)),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let downstream = DownstreamTlsContext { common_tls_context: Some(common), ..Default::default() };

    TransportSocket {
        name: TLS_TRANSPORT_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(EnvoyAny {
            type_url: DOWNSTREAM_TLS_CONTEXT_TYPE_URL.to_string(),
            value: downstream.encode_to_vec(),
        })),
    }
}

fn inline_bytes(bytes: &[u8]) -> DataSource {
    DataSource { watched_directory: None, specifier: Some(DataSourceSpecifier::InlineBytes(bytes.to_vec())) }
}

/// Decode the HTTP connection manager of a filter chain, if it has one.
pub fn decode_http_connection_manager(
    chain: &FilterChain,
) -> Result<Option<HttpConnectionManager>, crate::Error> {
    for filter in &chain.filters {
        if filter.name != HTTP_CONNECTION_MANAGER_FILTER_NAME {
            continue;
        }
        if let Some(FilterConfigType::TypedConfig(any)) = &filter.config_type {
            let hcm = HttpConnectionManager::decode(any.value.as_slice()).map_err(|e| {
                crate::Error::inconsistent(
                    "Listener",
                    &chain.name,
                    format!("has an undecodable HTTP connection manager: {}", e),
                )
            })?;
            return Ok(Some(hcm));
        }
    }
    Ok(None)
}
