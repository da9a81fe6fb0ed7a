//! Gateway listeners to Envoy Listeners.

use std::collections::BTreeMap;
use tracing::debug;

use super::naming;
use super::reference::ensure_authorized;
use crate::config::TranslatorConfig;
use crate::errors::{Error, Result};
use crate::model::core::{TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY};
use crate::model::gateway::{GatewayTlsConfig, SecretObjectReference};
use crate::model::{Gateway, GroupKind, KubeObject, Listener, ObjectRef, TlsMode, CORE_GROUP};
use crate::store::ResourceStore;
use crate::xds::listener::{
    FilterChainConfig, ListenerConfig, TlsCertificateConfig, TlsContextConfig,
};

pub const PROTOCOL_HTTP: &str = "HTTP";
pub const PROTOCOL_HTTPS: &str = "HTTPS";

/// Build the Envoy listener for `gateway.spec.listeners[index]`.
pub fn build_listener<S: ResourceStore + ?Sized>(
    store: &S,
    config: &TranslatorConfig,
    gateway: &Gateway,
    index: usize,
    listener: &Listener,
) -> Result<ListenerConfig> {
    let gateway_ref = gateway.object_ref();
    let gateway_key = gateway.key();
    let field = format!("spec.listeners[{}]", index);

    let tls_context = match listener.protocol.as_str() {
        PROTOCOL_HTTP => {
            if listener.tls.is_some() {
                return Err(Error::invalid(
                    gateway_ref,
                    format!("{}.tls", field),
                    "tls must not be set on an HTTP listener",
                ));
            }
            None
        }
        PROTOCOL_HTTPS => {
            let tls = listener.tls.as_ref().ok_or_else(|| {
                Error::invalid(
                    gateway_ref.clone(),
                    format!("{}.tls", field),
                    "HTTPS listener requires tls configuration",
                )
            })?;
            Some(build_tls_context(store, gateway, tls, &format!("{}.tls", field))?)
        }
        other => {
            return Err(Error::unsupported(
                gateway_ref,
                format!("{}.protocol", field),
                format!("protocol '{}' is not supported (HTTP and HTTPS are)", other),
            ))
        }
    };

    let name = naming::listener_name(&gateway_key, &listener.name);

    let server_names = match (&tls_context, listener.hostname.as_deref()) {
        (Some(_), Some(hostname)) if !hostname.is_empty() => vec![hostname.to_string()],
        _ => Vec::new(),
    };

    let metadata = BTreeMap::from([
        ("gateway".to_string(), gateway_key.to_string()),
        ("listener".to_string(), listener.name.clone()),
        ("protocol".to_string(), listener.protocol.clone()),
    ]);

    debug!(
        listener = %name,
        port = listener.port,
        protocol = %listener.protocol,
        tls = tls_context.is_some(),
        "Built listener"
    );

    Ok(ListenerConfig {
        name: name.clone(),
        address: config.listener_address.clone(),
        port: u32::from(listener.port),
        tls_inspector: tls_context.is_some(),
        filter_chains: vec![FilterChainConfig {
            name: Some(name.clone()),
            server_names,
            route_config_name: naming::route_config_name(&gateway_key, &listener.name),
            stat_prefix: naming::stat_prefix(&name),
            tls_context,
        }],
        metadata,
    })
}

fn build_tls_context<S: ResourceStore + ?Sized>(
    store: &S,
    gateway: &Gateway,
    tls: &GatewayTlsConfig,
    field: &str,
) -> Result<TlsContextConfig> {
    let gateway_ref = gateway.object_ref();

    if tls.mode == TlsMode::Passthrough {
        return Err(Error::unsupported(
            gateway_ref,
            format!("{}.mode", field),
            "TLS passthrough is not supported",
        ));
    }

    if tls.certificate_refs.is_empty() {
        return Err(Error::invalid(
            gateway_ref,
            format!("{}.certificateRefs", field),
            "TLS termination requires at least one certificate reference",
        ));
    }

    let certificates = tls
        .certificate_refs
        .iter()
        .enumerate()
        .map(|(index, cert_ref)| {
            resolve_certificate(store, gateway, cert_ref, &format!("{}.certificateRefs[{}]", field, index))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TlsContextConfig { certificates })
}

fn resolve_certificate<S: ResourceStore + ?Sized>(
    store: &S,
    gateway: &Gateway,
    cert_ref: &SecretObjectReference,
    field: &str,
) -> Result<TlsCertificateConfig> {
    let gateway_ref = gateway.object_ref();

    if cert_ref.group() != CORE_GROUP || cert_ref.kind() != "Secret" {
        return Err(Error::unsupported(
            gateway_ref,
            field,
            format!(
                "certificate reference kind {} is not supported, only core Secret",
                GroupKind::new(cert_ref.group(), cert_ref.kind())
            ),
        ));
    }

    let namespace = cert_ref.namespace.as_deref().unwrap_or(&gateway_ref.namespace);
    ensure_authorized(
        store,
        &gateway_ref,
        &GroupKind::gateway(),
        &GroupKind::secret(),
        namespace,
        &cert_ref.name,
        field,
    )?;

    let secret = store.secret(namespace, &cert_ref.name).ok_or_else(|| {
        Error::not_found_from(
            ObjectRef::new("Secret", namespace, cert_ref.name.clone()),
            format!("{} {}", gateway_ref, field),
        )
    })?;

    let decode = |key: &str| -> Result<Vec<u8>> {
        match secret.decoded(key) {
            Some(Ok(bytes)) if !bytes.is_empty() => Ok(bytes),
            Some(Ok(_)) => Err(Error::invalid(
                secret.object_ref(),
                format!("data.{}", key),
                "value is empty",
            )),
            Some(Err(e)) => Err(Error::invalid(
                secret.object_ref(),
                format!("data.{}", key),
                format!("value is not valid base64: {}", e),
            )),
            None => Err(Error::invalid(
                secret.object_ref(),
                format!("data.{}", key),
                "TLS Secret is missing this key",
            )),
        }
    };

    Ok(TlsCertificateConfig {
        certificate_chain: decode(TLS_CERT_KEY)?,
        private_key: decode(TLS_PRIVATE_KEY_KEY)?,
    })
}
