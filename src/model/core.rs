//! Core v1 objects: Namespace, Service and Secret.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::meta::{kube_object, ObjectMeta};

/// Secret key holding the PEM certificate chain of a `kubernetes.io/tls` Secret.
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret key holding the PEM private key of a `kubernetes.io/tls` Secret.
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
}

kube_object!(Service, "Service");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// `None` for headless Services.
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,

    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl Service {
    /// Cluster-internal address, or `None` for headless Services.
    pub fn cluster_ip(&self) -> Option<&str> {
        self.spec
            .cluster_ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case("None"))
    }

    pub fn port_by_number(&self, number: u16) -> Option<&ServicePort> {
        self.spec.ports.iter().find(|p| p.port == number)
    }

    pub fn port_by_name(&self, name: &str) -> Option<&ServicePort> {
        self.spec.ports.iter().find(|p| p.name.as_deref() == Some(name))
    }
}

/// Secret with its `data` values still base64 encoded, as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,

    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

kube_object!(Secret, "Secret");

impl Secret {
    /// Decoded bytes stored under `key`, `None` when the key is absent.
    pub fn decoded(&self, key: &str) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.data
            .get(key)
            .map(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_service_has_no_cluster_ip() {
        let service: Service = serde_yaml::from_str(
            r#"
metadata: { name: db, namespace: data }
spec:
  clusterIP: None
  ports:
    - name: sql
      port: 5432
"#,
        )
        .expect("service");
        assert_eq!(service.cluster_ip(), None);
        assert_eq!(service.port_by_name("sql").map(|p| p.port), Some(5432));
        assert!(service.port_by_number(5433).is_none());
    }

    #[test]
    fn secret_values_are_base64_decoded() {
        let secret: Secret = serde_yaml::from_str(
            r#"
metadata: { name: cert, namespace: ns1 }
type: kubernetes.io/tls
data:
  tls.crt: Y2VydA==
  tls.key: "!!!"
"#,
        )
        .expect("secret");

        assert_eq!(secret.decoded(TLS_CERT_KEY).expect("present").expect("valid"), b"cert");
        assert!(secret.decoded(TLS_PRIVATE_KEY_KEY).expect("present").is_err());
        assert!(secret.decoded("ca.crt").is_none());
    }
}
