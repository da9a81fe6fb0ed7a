//! # Structured Logging
//!
//! Span macros and startup logging helpers built on the tracing ecosystem.

/// Create a tracing span for translating one Gateway
#[macro_export]
macro_rules! translate_span {
    ($gateway:expr) => {
        tracing::info_span!("translate_gateway", gateway = %$gateway)
    };
    ($gateway:expr, $($field:tt)*) => {
        tracing::info_span!("translate_gateway", gateway = %$gateway, $($field)*)
    };
}

/// Create a tracing span for building the resources of one Gateway listener
#[macro_export]
macro_rules! listener_span {
    ($listener:expr) => {
        tracing::debug_span!("build_listener", listener = %$listener)
    };
    ($listener:expr, $($field:tt)*) => {
        tracing::debug_span!("build_listener", listener = %$listener, $($field)*)
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::TranslatorConfig) {
    tracing::info!(
        listener_address = %config.listener_address,
        connect_timeout_seconds = config.connect_timeout_seconds,
        endpoint_policy = %config.endpoint_policy,
        cluster_domain = %config.cluster_domain,
        "Gateway translator configuration"
    );
}
