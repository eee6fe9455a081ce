use serde::Deserialize;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, trace, warn};

use super::Reporter;
use crate::error::ReportError;
use crate::formatters::{Formatter, JsonFormatter};
use crate::parameters::Parameters;

/// Target under which [`TracingSink`] emits records.
pub const LOG_TARGET: &str = "request_logger";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Where a formatted line ends up.
pub trait LogSink: Send + Sync {
    fn write(&self, level: LogLevel, line: &str) -> Result<(), ReportError>;
}

/// Emits each line as a `tracing` event at the requested level.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, line: &str) -> Result<(), ReportError> {
        match level {
            LogLevel::Trace => trace!(target: LOG_TARGET, "{line}"),
            LogLevel::Debug => debug!(target: LOG_TARGET, "{line}"),
            LogLevel::Info => info!(target: LOG_TARGET, "{line}"),
            LogLevel::Warn => warn!(target: LOG_TARGET, "{line}"),
            LogLevel::Error => error!(target: LOG_TARGET, "{line}"),
        }
        Ok(())
    }
}

/// Writes one line per record to any writer, prefixed with the level.
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl LogSink for WriterSink {
    fn write(&self, level: LogLevel, line: &str) -> Result<(), ReportError> {
        let mut writer = self.writer.lock().map_err(|_| ReportError::SinkPoisoned)?;
        writeln!(writer, "{} {}", level.as_str(), line)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Tracing,
    Stdout,
    Stderr,
}

impl LogTarget {
    pub fn build(self) -> Arc<dyn LogSink> {
        match self {
            LogTarget::Tracing => Arc::new(TracingSink),
            LogTarget::Stdout => Arc::new(WriterSink::stdout()),
            LogTarget::Stderr => Arc::new(WriterSink::stderr()),
        }
    }
}

/// Formats the record and writes it to a log sink.
pub struct LogReporter {
    sink: Arc<dyn LogSink>,
    formatter: Arc<dyn Formatter>,
    level: LogLevel,
}

impl LogReporter {
    /// Any of the three may be left out: the defaults are the tracing sink,
    /// JSON lines and `info`.
    pub fn new(
        sink: Option<Arc<dyn LogSink>>,
        formatter: Option<Arc<dyn Formatter>>,
        level: Option<LogLevel>,
    ) -> Self {
        Self {
            sink: sink.unwrap_or_else(|| Arc::new(TracingSink)),
            formatter: formatter.unwrap_or_else(|| Arc::new(JsonFormatter)),
            level: level.unwrap_or_default(),
        }
    }
}

impl Reporter for LogReporter {
    fn perform(&self, parameters: &Parameters) -> Result<(), ReportError> {
        let line = self.formatter.format(parameters)?;
        self.sink.write(self.level, &line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::KeyValueFormatter;
    use serde_json::{json, Value};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn record() -> Parameters {
        match json!({"status": 201, "method": "POST"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_writes_formatted_line_at_level() {
        let buffer = Buffer::default();
        let reporter = LogReporter::new(
            Some(Arc::new(WriterSink::new(buffer.clone()))),
            Some(Arc::new(KeyValueFormatter)),
            Some(LogLevel::Warn),
        );

        reporter.perform(&record()).unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "WARN status=201 method=POST\n");
    }

    #[test]
    fn test_defaults_to_json_at_info() {
        let buffer = Buffer::default();
        let reporter = LogReporter::new(Some(Arc::new(WriterSink::new(buffer.clone()))), None, None);

        reporter.perform(&record()).unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "INFO {\"status\":201,\"method\":\"POST\"}\n");
    }

    #[test]
    fn test_level_deserializes_lowercase() {
        let level: LogLevel = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(level, LogLevel::Error);
    }
}
