use serde_json::Value;

use super::ParameterLogger;
use crate::parameters::{Parameters, RequestInfo, ResponseInfo};

/// Adds the inbound request headers under `headers`.
#[derive(Debug, Clone, Default)]
pub struct RequestHeadersLogger;

impl ParameterLogger for RequestHeadersLogger {
    fn parameters(&self, request: &RequestInfo, _response: &ResponseInfo) -> Parameters {
        let mut headers = Parameters::new();
        for (name, value) in &request.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            // Repeated headers are joined the way proxies fold them.
            match headers.get_mut(name.as_str()) {
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                _ => {
                    headers.insert(name.to_string(), Value::String(value));
                }
            }
        }

        let mut parameters = Parameters::new();
        parameters.insert("headers".to_string(), Value::Object(headers));
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use serde_json::json;

    #[test]
    fn test_headers_are_logged_and_repeats_joined() {
        let mut request = RequestInfo::default();
        request
            .headers
            .insert("x-request-id", HeaderValue::from_static("abc"));
        request
            .headers
            .append("accept", HeaderValue::from_static("text/html"));
        request
            .headers
            .append("accept", HeaderValue::from_static("application/json"));

        let parameters =
            RequestHeadersLogger.parameters(&request, &ResponseInfo::new(StatusCode::OK));

        assert_eq!(
            Value::Object(parameters),
            json!({"headers": {
                "x-request-id": "abc",
                "accept": "text/html, application/json"
            }})
        );
    }
}
