use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;

use crate::parameters::ResponseInfo;

/// How a request left the wrapped service, whatever channel it took.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(ResponseInfo),
    Failure { status: StatusCode, message: String },
}

impl Outcome {
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Outcome::Failure {
            status,
            message: message.into(),
        }
    }

    /// The request future was dropped before the wrapped service answered.
    pub fn cancelled() -> Self {
        let status = StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT);
        Outcome::failure(status, "request cancelled")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success(response) => response.status,
            Outcome::Failure { status, .. } => *status,
        }
    }

    /// The view handed to parameter loggers. Failures carry their message
    /// as the body.
    pub fn response_info(&self) -> ResponseInfo {
        match self {
            Outcome::Success(response) => response.clone(),
            Outcome::Failure { status, message } => {
                ResponseInfo::new(*status).with_body(message.clone())
            }
        }
    }
}

/// A handler halting the request with a status and message.
///
/// Returned from a handler it renders as a JSON error body and rides along
/// in the response extensions, where the request logger picks it up and
/// records the request as failed. The response itself is passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSignal {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorSignal {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorSignal {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(json!({
                "error": self.message,
            })),
        )
            .into_response();
        response.extensions_mut().insert(self);
        response
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
