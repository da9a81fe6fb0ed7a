//! # gateway-xds
//!
//! Compiles Kubernetes Gateway API configuration into Envoy xDS resources.
//!
//! Given a point-in-time view of Gateways, HTTPRoutes, Services, Secrets,
//! ReferenceGrants and Namespaces, the translator produces the Listeners,
//! RouteConfigurations, Clusters and ClusterLoadAssignments that configure an
//! Envoy proxy for one Gateway. It runs no xDS server and keeps no state
//! between calls.
//!
//! ## Architecture
//!
//! ```text
//! manifests → Snapshot (ResourceStore) → Translator → XdsResources → JSON
//!                                          ↓
//!              Reference Resolver · Listener / Route / Cluster builders
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gateway_xds::{config::TranslatorConfig, model::ObjectKey, store, Snapshot, Translator};
//!
//! fn main() -> gateway_xds::Result<()> {
//!     let resources = store::load_manifest_paths(&["manifests/"])?;
//!     let snapshot = Snapshot::from_resources(resources);
//!     let graph = Translator::new(&snapshot, TranslatorConfig::default())
//!         .translate_gateway(&ObjectKey::new("default", "gateway"))?;
//!     println!("{} resources", graph.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod model;
pub mod observability;
pub mod store;
pub mod translator;
pub mod xds;

// Re-export commonly used types and traits
pub use errors::{Error, Result};
pub use store::{ResourceStore, Snapshot};
pub use translator::{translate_gateway, Translator};
pub use xds::XdsResources;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
