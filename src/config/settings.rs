//! # Configuration Settings
//!
//! Defines the configuration structure for the Gateway translator.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

const ENV_LISTENER_ADDRESS: &str = "GATEWAY_XDS_LISTENER_ADDRESS";
const ENV_CONNECT_TIMEOUT: &str = "GATEWAY_XDS_CONNECT_TIMEOUT_SECONDS";
const ENV_ENDPOINT_POLICY: &str = "GATEWAY_XDS_ENDPOINT_POLICY";
const ENV_CLUSTER_DOMAIN: &str = "GATEWAY_XDS_CLUSTER_DOMAIN";
const ENV_LOG_FORMAT: &str = "GATEWAY_XDS_LOG_FORMAT";
const ENV_LOG_LEVEL: &str = "GATEWAY_XDS_LOG_LEVEL";

/// Translation settings shared by every builder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TranslatorConfig {
    /// Address every emitted Listener binds to
    #[validate(custom(function = "validate_ip_address"))]
    pub listener_address: String,

    /// Upstream connect timeout for emitted Clusters
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connect timeout must be between 1 and 300 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// How backend Services are turned into endpoints
    pub endpoint_policy: EndpointPolicyKind,

    /// DNS suffix used by the `service-dns` endpoint policy
    #[validate(length(min = 1, message = "Cluster domain cannot be empty"))]
    pub cluster_domain: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            listener_address: "0.0.0.0".to_string(),
            connect_timeout_seconds: 5,
            endpoint_policy: EndpointPolicyKind::ClusterIp,
            cluster_domain: "cluster.local".to_string(),
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let connect_timeout_seconds = match std::env::var(ENV_CONNECT_TIMEOUT) {
            Ok(value) => value.trim().parse().map_err(|e| {
                Error::config(format!("Invalid {}: {}", ENV_CONNECT_TIMEOUT, e))
            })?,
            Err(_) => defaults.connect_timeout_seconds,
        };

        let endpoint_policy = match std::env::var(ENV_ENDPOINT_POLICY) {
            Ok(value) => value.parse()?,
            Err(_) => defaults.endpoint_policy,
        };

        let config = Self {
            listener_address: std::env::var(ENV_LISTENER_ADDRESS)
                .unwrap_or(defaults.listener_address),
            connect_timeout_seconds,
            endpoint_policy,
            cluster_domain: std::env::var(ENV_CLUSTER_DOMAIN).unwrap_or(defaults.cluster_domain),
        };

        config.validate_config()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate_config(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn validate_ip_address(value: &str) -> std::result::Result<(), ValidationError> {
    value.parse::<IpAddr>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("ip_address");
        error.message = Some(format!("'{}' is not an IP address", value).into());
        error
    })
}

/// Endpoint resolution strategy for backend Services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointPolicyKind {
    /// EDS cluster fed with the Service cluster IP
    ClusterIp,
    /// STRICT_DNS cluster on the Service DNS name
    ServiceDns,
}

impl FromStr for EndpointPolicyKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cluster-ip" => Ok(Self::ClusterIp),
            "service-dns" => Ok(Self::ServiceDns),
            other => Err(Error::config(format!(
                "Invalid endpoint policy '{}': expected 'cluster-ip' or 'service-dns'",
                other
            ))),
        }
    }
}

impl fmt::Display for EndpointPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterIp => write!(f, "cluster-ip"),
            Self::ServiceDns => write!(f, "service-dns"),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Output format of the log lines
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), log_format: LogFormat::Text }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let log_format = match std::env::var(ENV_LOG_FORMAT) {
            Ok(value) => value.parse()?,
            Err(_) => defaults.log_format,
        };

        let config = Self {
            log_level: std::env::var(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format,
        };

        Validate::validate(&config).map_err(Error::from)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::config(format!(
                "Invalid log format '{}': expected 'text' or 'json'",
                other
            ))),
        }
    }
}
