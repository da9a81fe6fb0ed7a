//! JSON output document for translated resources.
//!
//! ```json
//! { "version": "<RFC 3339>", "resources": { "<type-url>": [ { "name", "typeUrl", "value" } ] } }
//! ```
//!
//! `value` is the base64 encoded protobuf message.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::xds::XdsResources;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub version: String,
    pub resources: BTreeMap<String, Vec<OutputResource>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResource {
    pub name: String,
    pub type_url: String,
    pub value: String,
}

impl OutputDocument {
    /// Document stamped with the current time.
    pub fn from_resources(resources: XdsResources) -> Self {
        Self::with_version(resources, chrono::Utc::now().to_rfc3339())
    }

    pub fn with_version(resources: XdsResources, version: impl Into<String>) -> Self {
        let resources = resources
            .into_resource_map()
            .into_iter()
            .map(|(kind, built)| {
                let entries = built
                    .into_iter()
                    .map(|resource| OutputResource {
                        type_url: resource.resource.type_url.clone(),
                        value: STANDARD.encode(&resource.resource.value),
                        name: resource.name,
                    })
                    .collect();
                (kind.type_url().to_string(), entries)
            })
            .collect();

        Self { version: version.into(), resources }
    }

    pub fn resource_count(&self) -> usize {
        self.resources.values().map(Vec::len).sum()
    }
}

/// Serialize the document and write it to `path`.
pub fn write_document(document: &OutputDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("Failed to serialize to JSON")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    Ok(())
}

/// Print the document as JSON
pub fn print_document(document: &OutputDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}
