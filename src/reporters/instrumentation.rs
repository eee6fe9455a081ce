use serde_json::Value;

use super::Reporter;
use crate::error::ReportError;
use crate::metrics;
use crate::notifications::Notifications;
use crate::parameters::Parameters;

/// Publishes the record on the notification bus under the instrumentation
/// key and feeds the request metrics labelled with it.
pub struct InstrumentationReporter {
    key: String,
    bus: Notifications,
}

impl InstrumentationReporter {
    pub fn new(key: impl Into<String>, bus: Notifications) -> Self {
        Self {
            key: key.into(),
            bus,
        }
    }
}

impl Reporter for InstrumentationReporter {
    fn perform(&self, parameters: &Parameters) -> Result<(), ReportError> {
        let status = parameters
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(0);
        let time = parameters.get("time");
        let total_ms = time
            .and_then(|t| t.get("total"))
            .and_then(Value::as_f64)
            .unwrap_or_default();
        let db_ms = time
            .and_then(|t| t.get("db"))
            .and_then(Value::as_f64)
            .unwrap_or_default();

        metrics::record_instrumented_request(&self.key, status, total_ms, db_ms);
        self.bus
            .instrument(&self.key, Value::Object(parameters.clone()));
        Ok(())
    }
}
