use anyhow::Result;
use serde::Deserialize;

use crate::formatters::FormatterKind;
use crate::loggers::filter_parameters::FilterParameters;
use crate::middleware::DEFAULT_MAX_BODY_BYTES;
use crate::reporters::{LogLevel, LogTarget};
use crate::timings::subscriber::{DEFAULT_ELAPSED_FIELD, DEFAULT_EVENT_TARGET};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub request_logging: RequestLoggingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Loggers that can be switched on by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludedLogger {
    Response,
    RequestHeaders,
    ClientEnv,
    FilterParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestLoggingConfig {
    pub include: Vec<IncludedLogger>,
    /// When set, records go to the notification bus under this key instead
    /// of the log.
    pub instrumentation_key: Option<String>,
    pub logger: LogTarget,
    pub formatter: FormatterKind,
    pub log_level: LogLevel,
    pub filtered_parameters: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            instrumentation_key: None,
            logger: LogTarget::default(),
            formatter: FormatterKind::default(),
            log_level: LogLevel::default(),
            filtered_parameters: default_filtered_parameters(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_filtered_parameters() -> Vec<String> {
    FilterParameters::default_keys()
        .iter()
        .map(|key| key.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Install the query timing subscriber. Without it `time.db` stays 0.
    pub enabled: bool,
    pub event_target: String,
    pub elapsed_field: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            event_target: DEFAULT_EVENT_TARGET.to_string(),
            elapsed_field: DEFAULT_ELAPSED_FIELD.to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| "config/default.yaml".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("request_logging.include")
                    .with_list_parse_key("request_logging.filtered_parameters")
                    .try_parsing(true),
            );

        // Override with environment variables if present
        if let Ok(host) = std::env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>()?)?;
        }
        if let Ok(metrics_port) = std::env::var("METRICS_PORT") {
            builder = builder.set_override("metrics.port", metrics_port.parse::<u16>()?)?;
        }

        let settings = builder.build()?;
        let config: AppConfig = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
