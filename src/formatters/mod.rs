//! Turning a finished record into one log line.

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ReportError;
use crate::parameters::Parameters;

pub trait Formatter: Send + Sync {
    fn format(&self, parameters: &Parameters) -> Result<String, ReportError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    #[default]
    Json,
    KeyValue,
    Logstash,
}

impl FormatterKind {
    pub fn build(self) -> Arc<dyn Formatter> {
        match self {
            FormatterKind::Json => Arc::new(JsonFormatter),
            FormatterKind::KeyValue => Arc::new(KeyValueFormatter),
            FormatterKind::Logstash => Arc::new(LogstashFormatter),
        }
    }
}

/// The record as a single JSON object.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, parameters: &Parameters) -> Result<String, ReportError> {
        Ok(serde_json::to_string(parameters)?)
    }
}

/// `key=value` pairs with nested objects flattened into dotted keys, e.g.
/// `status=200 time.total=12.5 time.db=3.1`.
#[derive(Debug, Clone, Default)]
pub struct KeyValueFormatter;

impl Formatter for KeyValueFormatter {
    fn format(&self, parameters: &Parameters) -> Result<String, ReportError> {
        let mut pairs = Vec::new();
        flatten(None, parameters, &mut pairs)?;
        Ok(pairs.join(" "))
    }
}

fn flatten(
    prefix: Option<&str>,
    parameters: &Parameters,
    pairs: &mut Vec<String>,
) -> Result<(), ReportError> {
    for (key, value) in parameters {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten(Some(&key), nested, pairs)?,
            Value::String(text) if needs_quoting(text) => {
                pairs.push(format!("{key}={}", serde_json::to_string(text)?));
            }
            Value::String(text) => pairs.push(format!("{key}={text}")),
            other => pairs.push(format!("{key}={}", serde_json::to_string(other)?)),
        }
    }
    Ok(())
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty() || text.chars().any(|c| c.is_whitespace() || c == '"' || c == '=')
}

/// JSON with the `@timestamp`/`@version` envelope logstash expects.
#[derive(Debug, Clone, Default)]
pub struct LogstashFormatter;

impl Formatter for LogstashFormatter {
    fn format(&self, parameters: &Parameters) -> Result<String, ReportError> {
        let mut event = Parameters::new();
        event.insert(
            "@timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        event.insert("@version".to_string(), Value::String("1".to_string()));
        event.extend(parameters.clone());
        Ok(serde_json::to_string(&event)?)
    }
}
