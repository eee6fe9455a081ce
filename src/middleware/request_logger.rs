use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
};
use futures::{future::BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::body::LoggedBody;
use super::invocation::Invocation;
use super::outcome::{panic_message, ErrorSignal, Outcome};
use super::Shared;
use crate::config::{IncludedLogger, RequestLoggingConfig};
use crate::error::ExposeStatus;
use crate::formatters::Formatter;
use crate::loggers::{
    ClientEnvLogger, FilterParameters, ParameterLogger, RequestHeadersLogger, ResponseLogger,
};
use crate::notifications::Notifications;
use crate::parameters::{RequestInfo, ResponseInfo};
use crate::reporters::{InstrumentationReporter, LogLevel, LogReporter, LogSink, Reporter};
use crate::timings::DbRuntime;

/// Largest response body, and form request body, copied for the loggers.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Layer that reports one structured record per request.
#[derive(Clone)]
pub struct RequestLoggerLayer {
    shared: Arc<Shared>,
}

impl RequestLoggerLayer {
    /// Logs through `tracing` as JSON at info, with no extra loggers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RequestLoggerBuilder {
        RequestLoggerBuilder::default()
    }

    pub fn from_config(config: &RequestLoggingConfig, bus: &Notifications) -> Self {
        let mut builder = Self::builder()
            .formatter(config.formatter.build())
            .logger(config.logger.build())
            .log_level(config.log_level)
            .max_body_bytes(config.max_body_bytes);

        for included in &config.include {
            builder = match included {
                IncludedLogger::Response => builder.include(ResponseLogger),
                IncludedLogger::RequestHeaders => builder.include(RequestHeadersLogger),
                IncludedLogger::ClientEnv => builder.include(ClientEnvLogger),
                IncludedLogger::FilterParameters => {
                    builder.include(FilterParameters::new(config.filtered_parameters.clone()))
                }
            };
        }

        if let Some(key) = &config.instrumentation_key {
            builder = builder.instrumentation_key(key.clone(), bus.clone());
        }

        builder.build()
    }
}

impl Default for RequestLoggerLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLogger<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogger {
            inner,
            shared: self.shared.clone(),
        }
    }
}

/// Configures a [`RequestLoggerLayer`].
///
/// Setting an instrumentation key selects the instrumentation reporter;
/// otherwise `logger`, `formatter` and `log_level` configure the log
/// reporter. `reporter` overrides both.
#[derive(Default)]
pub struct RequestLoggerBuilder {
    include: Vec<Arc<dyn ParameterLogger>>,
    instrumentation: Option<(String, Notifications)>,
    logger: Option<Arc<dyn LogSink>>,
    formatter: Option<Arc<dyn Formatter>>,
    log_level: Option<LogLevel>,
    reporter: Option<Arc<dyn Reporter>>,
    max_body_bytes: Option<usize>,
}

impl RequestLoggerBuilder {
    pub fn include<L: ParameterLogger + 'static>(self, logger: L) -> Self {
        self.include_shared(Arc::new(logger))
    }

    /// Include a logger the caller keeps a handle to.
    pub fn include_shared(mut self, logger: Arc<dyn ParameterLogger>) -> Self {
        self.include.push(logger);
        self
    }

    pub fn instrumentation_key(mut self, key: impl Into<String>, bus: Notifications) -> Self {
        self.instrumentation = Some((key.into(), bus));
        self
    }

    pub fn logger(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.logger = Some(sink);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Bodies past this size reach the client in full but are logged
    /// truncated.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    pub fn build(self) -> RequestLoggerLayer {
        let reporter: Arc<dyn Reporter> = match (self.reporter, self.instrumentation) {
            (Some(reporter), _) => reporter,
            (None, Some((key, bus))) => Arc::new(InstrumentationReporter::new(key, bus)),
            (None, None) => Arc::new(LogReporter::new(self.logger, self.formatter, self.log_level)),
        };
        let capture_body = self.include.iter().any(|l| l.needs_response_body());

        RequestLoggerLayer {
            shared: Arc::new(Shared {
                loggers: self.include,
                reporter,
                capture_body,
                max_body_bytes: self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            }),
        }
    }
}

/// Service produced by [`RequestLoggerLayer`]. Responses, errors and panics
/// from the wrapped service pass through untouched.
#[derive(Clone)]
pub struct RequestLogger<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> Service<Request<Body>> for RequestLogger<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: ExposeStatus + Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let shared = self.shared.clone();

        Box::pin(async move {
            let (mut request, info) = RequestInfo::capture(request, shared.max_body_bytes).await;
            let db_runtime = DbRuntime::new();
            request.extensions_mut().insert(db_runtime.clone());

            let mut invocation = Invocation::new(shared.clone(), info, db_runtime.clone());
            invocation.before();

            let result = AssertUnwindSafe(db_runtime.scope(inner.call(request)))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(response)) => {
                    if let Some(signal) = response.extensions().get::<ErrorSignal>() {
                        invocation.after(&Outcome::failure(signal.status, signal.message.clone()));
                        return Ok(response);
                    }

                    let (parts, body) = response.into_parts();
                    let info = ResponseInfo::from_parts(&parts);
                    if !shared.capture_body {
                        invocation.after(&Outcome::Success(info));
                        return Ok(Response::from_parts(parts, body));
                    }

                    // Reported when the client has been sent the body.
                    let body = LoggedBody::new(
                        body,
                        invocation,
                        info,
                        db_runtime,
                        shared.max_body_bytes,
                    );
                    Ok(Response::from_parts(parts, Body::new(body)))
                }
                Ok(Err(err)) => {
                    let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    invocation.after(&Outcome::failure(status, err.to_string()));
                    Err(err)
                }
                Err(panic) => {
                    invocation.after(&Outcome::failure(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        panic_message(&*panic),
                    ));
                    std::panic::resume_unwind(panic)
                }
            }
        })
    }
}
