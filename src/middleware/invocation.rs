use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

use super::outcome::Outcome;
use super::Shared;
use crate::metrics;
use crate::parameters::{deep_merge, round2, Parameters, RequestInfo};
use crate::timings::DbRuntime;

/// The lifecycle of one request through the logger.
///
/// Reports exactly once: through `after`, or from `Drop` when the request
/// future is abandoned before the wrapped service answers.
pub(crate) struct Invocation {
    shared: Arc<Shared>,
    request: RequestInfo,
    db_runtime: DbRuntime,
    start_time: Option<Instant>,
    stop_time: Option<Instant>,
    reported: bool,
}

impl Invocation {
    pub(crate) fn new(shared: Arc<Shared>, request: RequestInfo, db_runtime: DbRuntime) -> Self {
        Self {
            shared,
            request,
            db_runtime,
            start_time: None,
            stop_time: None,
            reported: false,
        }
    }

    pub(crate) fn before(&mut self) {
        self.db_runtime.reset();
        self.start_time();
        for logger in &self.shared.loggers {
            logger.before();
        }
    }

    pub(crate) fn after(&mut self, outcome: &Outcome) {
        if self.reported {
            return;
        }
        self.reported = true;
        self.stop_time();

        let parameters = self.collect_parameters(outcome);
        if let Err(err) = self.shared.reporter.perform(&parameters) {
            error!(
                error = %err,
                method = %self.request.method,
                path = %self.request.path,
                "Failed to report request"
            );
            metrics::record_report_failure();
        }

        for logger in &self.shared.loggers {
            logger.after();
        }
    }

    fn start_time(&mut self) -> Instant {
        *self.start_time.get_or_insert_with(Instant::now)
    }

    fn stop_time(&mut self) -> Instant {
        *self.stop_time.get_or_insert_with(Instant::now)
    }

    fn total_runtime(&self) -> f64 {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => {
                round2(stop.saturating_duration_since(start).as_secs_f64() * 1000.0)
            }
            _ => 0.0,
        }
    }

    fn db_runtime(&self) -> f64 {
        self.db_runtime.read_ms()
    }

    fn view_runtime(&self) -> f64 {
        // Queries run concurrently inside one request can add up to more
        // than the wall-clock total.
        round2((self.total_runtime() - self.db_runtime()).max(0.0))
    }

    fn parameters(&self, outcome: &Outcome) -> Parameters {
        let record = json!({
            "status": outcome.status().as_u16(),
            "time": {
                "total": self.total_runtime(),
                "db": self.db_runtime(),
                "view": self.view_runtime(),
            },
            "method": self.request.method,
            "path": self.request.path,
            "params": self.request.params,
            "host": self.request.host,
        });

        match record {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    fn collect_parameters(&self, outcome: &Outcome) -> Parameters {
        let mut parameters = self.parameters(outcome);
        let response = outcome.response_info();
        for logger in &self.shared.loggers {
            deep_merge(&mut parameters, logger.parameters(&self.request, &response));
        }
        parameters
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        warn!(
            method = %self.request.method,
            path = %self.request.path,
            "Request dropped before completion"
        );
        metrics::record_cancelled_request();
        self.after(&Outcome::cancelled());
    }
}
