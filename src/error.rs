use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised while delivering a finished record to its sink.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to format log record: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Failed to write log record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log sink lock poisoned")]
    SinkPoisoned,
}

/// An application error carrying the HTTP status it should be logged and
/// answered with.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
        });

        (self.status, Json(body)).into_response()
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by a wrapped service. The middleware reads the status
/// to log from here; errors that do not expose one are logged as 500.
pub trait ExposeStatus: Display {
    fn status(&self) -> Option<StatusCode> {
        None
    }
}

impl ExposeStatus for Infallible {}

impl ExposeStatus for HandlerError {
    fn status(&self) -> Option<StatusCode> {
        Some(self.status)
    }
}

impl ExposeStatus for BoxError {
    fn status(&self) -> Option<StatusCode> {
        let root: &(dyn std::error::Error + 'static) = &**self;
        let mut current = Some(root);
        while let Some(err) = current {
            if let Some(handler_error) = err.downcast_ref::<HandlerError>() {
                return Some(handler_error.status);
            }
            current = err.source();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("wrapped: {0}")]
    struct Wrapper(#[source] HandlerError);

    #[test]
    fn test_handler_error_exposes_status() {
        let err = HandlerError::new(StatusCode::NOT_FOUND, "missing");
        assert_eq!(ExposeStatus::status(&err), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "missing");
    }

    #[test]
    fn test_boxed_error_finds_status_in_source_chain() {
        let boxed: BoxError = Box::new(Wrapper(HandlerError::new(
            StatusCode::CONFLICT,
            "already exists",
        )));
        assert_eq!(boxed.status(), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_foreign_error_has_no_status() {
        let boxed: BoxError = "plain failure".into();
        assert_eq!(boxed.status(), None);
        assert_eq!(boxed.to_string(), "plain failure");
    }
}
