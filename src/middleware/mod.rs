// Request logging middleware
mod body;
mod invocation;
pub mod outcome;
pub mod request_logger;

use std::sync::Arc;

use crate::loggers::ParameterLogger;
use crate::reporters::Reporter;

pub use outcome::{ErrorSignal, Outcome};
pub use request_logger::{
    RequestLogger, RequestLoggerBuilder, RequestLoggerLayer, DEFAULT_MAX_BODY_BYTES,
};

/// Configuration shared by every request going through one layer.
pub(crate) struct Shared {
    loggers: Vec<Arc<dyn ParameterLogger>>,
    reporter: Arc<dyn Reporter>,
    capture_body: bool,
    max_body_bytes: usize,
}
