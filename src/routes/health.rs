use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub request_logging: RequestLoggingInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestLoggingInfo {
    pub reporter: String,
    pub included_loggers: usize,
    pub db_timing_enabled: bool,
}

/// Basic health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "request-logger".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Detailed health check endpoint
///
/// Reports how request logging is wired up in this process.
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    info!("Detailed health check requested");

    let logging = &state.config.request_logging;
    let reporter = match &logging.instrumentation_key {
        Some(key) => format!("instrumentation:{key}"),
        None => "log".to_string(),
    };

    Json(DetailedHealthResponse {
        status: "healthy".to_string(),
        service: "request-logger".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        request_logging: RequestLoggingInfo {
            reporter,
            included_loggers: logging.include.len(),
            db_timing_enabled: state.config.database.enabled,
        },
    })
}
