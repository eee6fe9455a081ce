use metrics::{counter, histogram, Counter};
use once_cell::sync::Lazy;

pub struct ReporterMetrics {
    pub report_failures_total: Counter,
    pub cancelled_requests_total: Counter,
}

pub static REPORTER_METRICS: Lazy<ReporterMetrics> = Lazy::new(|| ReporterMetrics {
    report_failures_total: counter!("request_logger_report_failures_total"),
    cancelled_requests_total: counter!("request_logger_cancelled_requests_total"),
});

/// Record one instrumented request under its instrumentation key.
pub fn record_instrumented_request(key: &str, status_code: u16, total_ms: f64, db_ms: f64) {
    let key = key.to_string();

    counter!("request_logger_requests_total", "key" => key.clone()).increment(1);
    histogram!("request_logger_latency_ms", "key" => key.clone()).record(total_ms);
    histogram!("request_logger_db_latency_ms", "key" => key.clone()).record(db_ms);

    if status_code >= 500 {
        counter!("request_logger_5xx_total", "key" => key).increment(1);
    }
}

pub fn record_report_failure() {
    REPORTER_METRICS.report_failures_total.increment(1);
}

pub fn record_cancelled_request() {
    REPORTER_METRICS.cancelled_requests_total.increment(1);
}
