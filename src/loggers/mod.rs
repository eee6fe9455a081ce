//! Pluggable contributors of extra fields to a request's log record.

use crate::parameters::{Parameters, RequestInfo, ResponseInfo};

pub mod client_env;
pub mod filter_parameters;
pub mod request_headers;
pub mod response;

pub use client_env::ClientEnvLogger;
pub use filter_parameters::FilterParameters;
pub use request_headers::RequestHeadersLogger;
pub use response::ResponseLogger;

/// A contributor to the request log record.
///
/// `before` runs when the request enters the middleware and `after` once
/// the record has been reported. Both default to doing nothing. A single
/// instance serves every request, so any state kept across calls needs
/// interior mutability.
pub trait ParameterLogger: Send + Sync {
    fn before(&self) {}

    fn after(&self) {}

    /// Whether `parameters` reads the response body. The middleware only
    /// buffers bodies when at least one included logger asks for it.
    fn needs_response_body(&self) -> bool {
        false
    }

    fn parameters(&self, request: &RequestInfo, response: &ResponseInfo) -> Parameters;
}
