//! # Command Line Interface
//!
//! Loads Kubernetes manifests into a snapshot, translates one Gateway and
//! writes the resulting resource graph as JSON.

pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::config::{EndpointPolicyKind, LogFormat, ObservabilityConfig, TranslatorConfig};
use crate::model::ObjectKey;
use crate::observability::{init_logging, log_config_info};
use crate::store::{load_manifest_paths, Snapshot};
use crate::translator::Translator;

/// Output file used when `--output` is not given.
pub const DEFAULT_OUTPUT: &str = "envoy-xds.json";
const STDOUT_OUTPUT: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "gateway-xds")]
#[command(about = "Translate a Gateway API Gateway into Envoy xDS resources")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Name of the Gateway to translate
    #[arg(long, short = 'g')]
    pub gateway: String,

    /// Namespace of the Gateway
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,

    /// Manifest files or directories (YAML or JSON, multi-document)
    #[arg(long, short = 'm', required = true, num_args = 1..)]
    pub manifests: Vec<PathBuf>,

    /// Output file; `-` prints the document to stdout
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Listener bind address override
    #[arg(long)]
    pub listener_address: Option<String>,

    /// Cluster connect timeout override, in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Endpoint resolution policy override
    #[arg(long, value_enum)]
    pub endpoint_policy: Option<EndpointPolicyKind>,

    /// Cluster DNS domain override
    #[arg(long)]
    pub cluster_domain: Option<String>,

    /// Log output format override
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Environment configuration with command line overrides applied.
    pub fn translator_config(&self) -> crate::Result<TranslatorConfig> {
        let mut config = TranslatorConfig::from_env()?;

        if let Some(address) = &self.listener_address {
            config.listener_address = address.clone();
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout_seconds = timeout;
        }
        if let Some(policy) = self.endpoint_policy {
            config.endpoint_policy = policy;
        }
        if let Some(domain) = &self.cluster_domain {
            config.cluster_domain = domain.clone();
        }

        config.validate_config()?;
        Ok(config)
    }

    pub fn observability_config(&self) -> crate::Result<ObservabilityConfig> {
        let mut config = ObservabilityConfig::from_env()?;
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }

    pub fn gateway_key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.gateway.clone())
    }
}

/// Run CLI commands
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let observability = cli.observability_config()?;
    init_logging(&observability, cli.verbose);

    run(&cli)
}

/// Translate the requested Gateway and emit the output document.
///
/// Nothing is written unless translation and the consistency check succeed.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.translator_config()?;
    log_config_info(&config);

    let resources = load_manifest_paths(&cli.manifests)?;
    let snapshot = Snapshot::from_resources(resources);
    info!(objects = snapshot.len(), paths = cli.manifests.len(), "Loaded manifests");

    let gateway = cli.gateway_key();
    let resources = Translator::new(&snapshot, config)
        .translate_gateway(&gateway)
        .with_context(|| format!("Failed to translate Gateway {}", gateway))?;

    let document = output::OutputDocument::from_resources(resources);
    if cli.output.as_os_str() == STDOUT_OUTPUT {
        output::print_document(&document)?;
    } else {
        output::write_document(&document, &cli.output)?;
        info!(
            path = %cli.output.display(),
            resources = document.resource_count(),
            "Wrote xDS resources"
        );
    }

    Ok(())
}
