//! Object identity shared by every Kubernetes input type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace assumed for namespaced manifests that omit `metadata.namespace`.
pub const DEFAULT_NAMESPACE: &str = "default";

/// API group of the Gateway API resources.
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// The core API group is spelled as the empty string in Gateway API references.
pub const CORE_GROUP: &str = "";

/// Subset of `metav1.ObjectMeta` the translator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: Some(namespace.into()), labels: BTreeMap::new() }
    }

    /// Namespace of the object, falling back to `default`.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// Namespace/name pair identifying a namespaced object within one kind.
///
/// Ordering is namespace first, then name, which is the iteration order the
/// translator relies on for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind-qualified object identity used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { kind: kind.into(), namespace: namespace.into(), name: name.into() }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// API group and kind of a referenced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { group: group.into(), kind: kind.into() }
    }

    pub fn gateway() -> Self {
        Self::new(GATEWAY_API_GROUP, "Gateway")
    }

    pub fn http_route() -> Self {
        Self::new(GATEWAY_API_GROUP, "HTTPRoute")
    }

    pub fn service() -> Self {
        Self::new(CORE_GROUP, "Service")
    }

    pub fn secret() -> Self {
        Self::new(CORE_GROUP, "Secret")
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Common accessors for the namespaced input kinds.
pub trait KubeObject {
    /// Kubernetes `kind` of the object.
    const KIND: &'static str;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        let meta = self.metadata();
        ObjectKey::new(meta.namespace(), meta.name.clone())
    }

    fn object_ref(&self) -> ObjectRef {
        let meta = self.metadata();
        ObjectRef::new(Self::KIND, meta.namespace(), meta.name.clone())
    }
}

/// Implements [`KubeObject`] for a type with a `metadata: ObjectMeta` field.
macro_rules! kube_object {
    ($ty:ty, $kind:literal) => {
        impl $crate::model::KubeObject for $ty {
            const KIND: &'static str = $kind;

            fn metadata(&self) -> &$crate::model::ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut $crate::model::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use kube_object;
