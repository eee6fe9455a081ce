//! Destinations for the finished request record.

use crate::error::ReportError;
use crate::parameters::Parameters;

pub mod instrumentation;
pub mod logger;

pub use instrumentation::InstrumentationReporter;
pub use logger::{LogLevel, LogReporter, LogSink, LogTarget, TracingSink, WriterSink};

/// Receives each request's record exactly once.
pub trait Reporter: Send + Sync {
    fn perform(&self, parameters: &Parameters) -> Result<(), ReportError>;
}
