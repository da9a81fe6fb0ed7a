//! Cross-namespace reference authorization.
//!
//! A reference from an object in one namespace to an object in another is
//! honoured only when a ReferenceGrant in the *target* namespace allows it.
//! Same-namespace references never consult grants.

use crate::errors::{Error, Result};
use crate::model::{GroupKind, ObjectRef, ReferenceGrant};
use crate::store::ResourceStore;

/// A reference from one object to another, possibly across namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossNamespaceRef<'a> {
    pub from: &'a GroupKind,
    pub from_namespace: &'a str,
    pub to: &'a GroupKind,
    pub to_namespace: &'a str,
    pub to_name: &'a str,
}

impl CrossNamespaceRef<'_> {
    pub fn is_cross_namespace(&self) -> bool {
        self.from_namespace != self.to_namespace
    }
}

/// Decide whether `reference` is permitted by `grants`.
///
/// Only grants living in the target namespace are considered, whatever the
/// caller passes in.
pub fn authorize(grants: &[&ReferenceGrant], reference: &CrossNamespaceRef<'_>) -> bool {
    if !reference.is_cross_namespace() {
        return true;
    }

    grants
        .iter()
        .filter(|grant| grant.metadata.namespace() == reference.to_namespace)
        .any(|grant| {
            let from_matches = grant.spec.from.iter().any(|from| {
                from.group == reference.from.group
                    && from.kind == reference.from.kind
                    && from.namespace == reference.from_namespace
            });
            let to_matches = grant.spec.to.iter().any(|to| {
                to.group == reference.to.group
                    && to.kind == reference.to.kind
                    && to.name.as_deref().map_or(true, |name| name == reference.to_name)
            });
            from_matches && to_matches
        })
}

/// Authorize a reference made by `referrer` at `field`, failing with
/// [`Error::UnauthorizedReference`] when no grant allows it.
pub fn ensure_authorized<S: ResourceStore + ?Sized>(
    store: &S,
    referrer: &ObjectRef,
    referrer_kind: &GroupKind,
    target_kind: &GroupKind,
    target_namespace: &str,
    target_name: &str,
    field: &str,
) -> Result<()> {
    let reference = CrossNamespaceRef {
        from: referrer_kind,
        from_namespace: &referrer.namespace,
        to: target_kind,
        to_namespace: target_namespace,
        to_name: target_name,
    };

    if !reference.is_cross_namespace() {
        return Ok(());
    }

    if authorize(&store.reference_grants_in(target_namespace), &reference) {
        tracing::debug!(
            from = %referrer,
            to_kind = %target_kind,
            to = %format!("{}/{}", target_namespace, target_name),
            "Cross-namespace reference permitted by ReferenceGrant"
        );
        Ok(())
    } else {
        Err(Error::unauthorized(
            referrer.clone(),
            ObjectRef::new(target_kind.kind.clone(), target_namespace, target_name),
            field,
        ))
    }
}
