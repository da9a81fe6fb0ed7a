//! # Configuration Management
//!
//! Environment-driven settings for the translator and its logging. Values are
//! read after `dotenvy` has loaded any `.env` file, then validated with the
//! `validator` crate. Command line flags override what is read here.

pub mod settings;

pub use settings::{EndpointPolicyKind, LogFormat, ObservabilityConfig, TranslatorConfig};
