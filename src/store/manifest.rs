//! Loading Kubernetes manifests from YAML or JSON.
//!
//! Files may hold several YAML documents and `kind: List` wrappers. Objects of
//! kinds the translator does not read are skipped; namespaced objects without a
//! namespace are placed in `default`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::model::{
    Gateway, HttpRoute, KubeObject, Namespace, ReferenceGrant, Secret, Service, DEFAULT_NAMESPACE,
};

/// One decoded input object.
#[derive(Debug, Clone, PartialEq)]
pub enum KubeResource {
    Namespace(Namespace),
    Gateway(Gateway),
    HttpRoute(HttpRoute),
    Service(Service),
    Secret(Secret),
    ReferenceGrant(ReferenceGrant),
}

macro_rules! impl_from_resource {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for KubeResource {
                fn from(object: $variant) -> Self {
                    KubeResource::$variant(object)
                }
            }
        )*
    };
}

impl_from_resource!(Namespace, Gateway, HttpRoute, Service, Secret, ReferenceGrant);

/// Parse every supported object out of a manifest text.
///
/// `source_name` is only used in error messages.
pub fn parse_manifests(source_name: &str, contents: &str) -> Result<Vec<KubeResource>> {
    let mut resources = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(contents).enumerate() {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| {
            Error::manifest(source_name, format!("document {}: {}", index, e))
        })?;
        if value.is_null() {
            continue;
        }

        let value = serde_json::to_value(&value).map_err(|e| {
            Error::manifest(source_name, format!("document {}: {}", index, e))
        })?;
        collect_objects(source_name, value, &mut resources)?;
    }

    Ok(resources)
}

fn collect_objects(source_name: &str, value: Value, out: &mut Vec<KubeResource>) -> Result<()> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::manifest(source_name, "object without a 'kind'"))?
        .to_string();

    match kind.as_str() {
        "List" => {
            let items = match value.get("items") {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(_) => return Err(Error::manifest(source_name, "'items' of a List must be an array")),
            };
            for item in items {
                collect_objects(source_name, item, out)?;
            }
        }
        "Namespace" => out.push(KubeResource::Namespace(decode(source_name, &kind, value)?)),
        "Gateway" => out.push(KubeResource::Gateway(decode_namespaced(source_name, value)?)),
        "HTTPRoute" => out.push(KubeResource::HttpRoute(decode_namespaced(source_name, value)?)),
        "Service" => out.push(KubeResource::Service(decode_namespaced(source_name, value)?)),
        "Secret" => out.push(KubeResource::Secret(decode_namespaced(source_name, value)?)),
        "ReferenceGrant" => {
            out.push(KubeResource::ReferenceGrant(decode_namespaced(source_name, value)?))
        }
        other => {
            debug!(source = %source_name, kind = %other, "Skipping unsupported manifest kind");
        }
    }

    Ok(())
}

fn decode<T: DeserializeOwned>(source_name: &str, kind: &str, value: Value) -> Result<T> {
    let name = value
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string();
    serde_json::from_value(value)
        .map_err(|e| Error::manifest(source_name, format!("{} {}: {}", kind, name, e)))
}

fn decode_namespaced<T: DeserializeOwned + KubeObject>(source_name: &str, value: Value) -> Result<T> {
    let mut object: T = decode(source_name, T::KIND, value)?;
    let metadata = object.metadata_mut();
    if metadata.namespace.as_deref().map_or(true, str::is_empty) {
        metadata.namespace = Some(DEFAULT_NAMESPACE.to_string());
    }
    Ok(object)
}

/// Read one manifest file.
pub fn load_manifest_file(path: &Path) -> Result<Vec<KubeResource>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::io(e, format!("Failed to read manifest {}", path.display())))?;
    let resources = parse_manifests(&path.display().to_string(), &contents)?;
    debug!(path = %path.display(), objects = resources.len(), "Loaded manifest file");
    Ok(resources)
}

/// Read every manifest under the given files and directories.
///
/// Directories are scanned (not recursively) for `.yaml`, `.yml` and `.json`
/// files, in file-name order.
pub fn load_manifest_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<KubeResource>> {
    let mut resources = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            for file in manifest_files_in(path)? {
                resources.extend(load_manifest_file(&file)?);
            }
        } else {
            resources.extend(load_manifest_file(path)?);
        }
    }

    Ok(resources)
}

fn manifest_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::io(e, format!("Failed to list directory {}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::io(e, format!("Failed to list directory {}", dir.display())))?
            .path();
        let is_manifest = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"));
        if path.is_file() && is_manifest {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_document_yaml() {
        let resources = parse_manifests(
            "inline",
            r#"
apiVersion: v1
kind: Service
metadata:
  name: svc1
spec:
  clusterIP: 10.0.0.1
  ports:
    - port: 8080
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ignored
---
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Namespace
    metadata:
      name: ns1
      labels:
        team: web
  - apiVersion: v1
    kind: Secret
    metadata:
      name: cert
      namespace: ns1
    data:
      tls.crt: Y2VydA==
"#,
        )
        .expect("manifests");

        assert_eq!(resources.len(), 3);
        match &resources[0] {
            KubeResource::Service(service) => assert_eq!(service.metadata.namespace(), "default"),
            other => panic!("expected a Service, got {:?}", other),
        }
        assert!(matches!(&resources[1], KubeResource::Namespace(ns) if ns.metadata.name == "ns1"));
        assert!(matches!(&resources[2], KubeResource::Secret(_)));
    }

    #[test]
    fn parses_json_documents() {
        let resources = parse_manifests(
            "inline.json",
            r#"{"apiVersion":"v1","kind":"Service","metadata":{"name":"s","namespace":"n"},"spec":{"ports":[{"port":80}]}}"#,
        )
        .expect("json manifest");
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn reports_malformed_objects() {
        let error = parse_manifests(
            "bad.yaml",
            r#"
kind: Service
metadata:
  name: svc1
spec:
  ports:
    - port: not-a-number
"#,
        )
        .unwrap_err();
        assert_eq!(error.category(), "manifest");
        assert!(error.to_string().contains("bad.yaml"));
        assert!(error.to_string().contains("Service svc1"));
    }

    #[test]
    fn rejects_documents_without_kind() {
        let error = parse_manifests("x.yaml", "metadata: { name: a }").unwrap_err();
        assert!(error.to_string().contains("kind"));
    }

    #[test]
    fn loads_directories_in_file_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("b.yaml"),
            "kind: Service\nmetadata: { name: second, namespace: n }\n",
        )
        .expect("write");
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"kind":"Service","metadata":{"name":"first","namespace":"n"}}"#,
        )
        .expect("write");
        std::fs::write(dir.path().join("notes.txt"), "not a manifest").expect("write");

        let resources = load_manifest_paths(&[dir.path()]).expect("load");
        let names: Vec<&str> = resources
            .iter()
            .map(|r| match r {
                KubeResource::Service(s) => s.metadata.name.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = load_manifest_paths(&["/nonexistent/gateway.yaml"]).unwrap_err();
        assert_eq!(error.category(), "io");
    }
}
