use crate::providers::constants::upstream::OPENAI_BASE_URL;
use crate::proxy::types::{ProxyConfig, RequestSizeLimit, UpstreamBaseUrl};
use crate::{Error, Result};
use ::config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use http::HeaderName;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `USAGE_RELAY__UPSTREAM__BASE_URL`
pub const ENV_PREFIX: &str = "USAGE_RELAY";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub upstream: UpstreamSettings,
    pub audit: AuditSettings,
    pub publisher: PublisherSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub caller_key_header: String,
    pub request_timeout_secs: u64,
    pub max_request_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditSettings {
    /// Publish request and response bodies. Usage records are always published.
    pub log_content: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    /// Write events to the local tracing output only
    Log,
    /// Produce events through a Kafka REST proxy
    RestProxy,
    /// Produce events straight to the Kafka cluster (`kafka` feature)
    Kafka,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublisherSettings {
    pub kind: PublisherKind,
    pub rest_proxy_url: Option<String>,
    pub bootstrap_servers: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub queue_capacity: usize,
    pub delivery_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::builder(&environment)?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            // Hosting platforms hand the listening port over as plain PORT
            .set_override_option("application.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Builder pre-loaded with every default value
    pub fn builder(
        environment: &str,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("application.host", "0.0.0.0")?
            .set_default("application.port", 8080)?
            .set_default("application.environment", environment)?
            .set_default("upstream.base_url", OPENAI_BASE_URL)?
            .set_default("upstream.caller_key_header", "X-Api-Key")?
            .set_default("upstream.request_timeout_secs", 600)?
            .set_default("upstream.max_request_size", 32 * 1024 * 1024)?
            .set_default("audit.log_content", true)?
            .set_default("publisher.kind", "log")?
            .set_default("publisher.queue_capacity", 4096)?
            .set_default("publisher.delivery_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")
    }

    /// Validate the upstream section into the proxy's typed configuration
    pub fn proxy_config(&self) -> Result<ProxyConfig> {
        let upstream_base_url = UpstreamBaseUrl::try_new(self.upstream.base_url.clone())
            .map_err(|e| Error::invalid_setting("upstream.base_url", e.to_string()))?;

        let caller_key_header = HeaderName::from_bytes(self.upstream.caller_key_header.as_bytes())
            .map_err(|e| Error::invalid_setting("upstream.caller_key_header", e.to_string()))?;

        let max_request_size = RequestSizeLimit::try_new(self.upstream.max_request_size)
            .map_err(|e| Error::invalid_setting("upstream.max_request_size", e.to_string()))?;

        Ok(ProxyConfig {
            upstream_base_url,
            caller_key_header,
            max_request_size,
            request_timeout: Duration::from_secs(self.upstream.request_timeout_secs),
            log_content: self.audit.log_content,
        })
    }
}
