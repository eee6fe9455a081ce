use axum::http::header;
use serde_json::Value;

use super::ParameterLogger;
use crate::parameters::{Parameters, RequestInfo, ResponseInfo};

/// Adds the client address (`ip`) and user agent (`ua`).
///
/// The address is the first hop of `X-Forwarded-For` when present, else the
/// connection's peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientEnvLogger;

impl ParameterLogger for ClientEnvLogger {
    fn parameters(&self, request: &RequestInfo, _response: &ResponseInfo) -> Parameters {
        let forwarded = request
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());

        let ip = forwarded.or_else(|| request.peer_addr.map(|addr| addr.ip().to_string()));

        let ua = request
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut parameters = Parameters::new();
        parameters.insert("ip".to_string(), ip.map_or(Value::Null, Value::String));
        parameters.insert("ua".to_string(), ua.map_or(Value::Null, Value::String));
        parameters
    }
}
