use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod formatters;
pub mod loggers;
pub mod metrics;
pub mod middleware;
pub mod notifications;
pub mod parameters;
pub mod reporters;
pub mod routes;
pub mod timings;

pub use error::{ExposeStatus, HandlerError, ReportError};
pub use loggers::ParameterLogger;
pub use middleware::{ErrorSignal, Outcome, RequestLogger, RequestLoggerBuilder, RequestLoggerLayer};
pub use notifications::{Notification, Notifications};
pub use parameters::{deep_merge, Parameters, RequestInfo, ResponseInfo};
pub use reporters::Reporter;
pub use timings::{DbRuntime, DbRuntimeLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub notifications: Notifications,
}

impl AppState {
    pub fn new(config: config::AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            notifications: Notifications::default(),
        }
    }
}

/// The demo API with request logging configured from `state.config`.
pub fn create_app(state: AppState) -> Router {
    let request_logger =
        RequestLoggerLayer::from_config(&state.config.request_logging, &state.notifications);
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/v1/health", get(routes::health::health_detailed))
        .route(
            "/api/v1/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(request_logger),
        )
        .with_state(state)
}
