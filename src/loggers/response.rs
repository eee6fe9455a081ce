use serde_json::{Deserializer, Value};

use super::ParameterLogger;
use crate::parameters::{Parameters, RequestInfo, ResponseInfo};

/// Adds the response body under `response`.
///
/// A body made of one or more JSON documents is logged as the array of
/// parsed documents. Anything else is logged as the raw text.
#[derive(Debug, Clone, Default)]
pub struct ResponseLogger;

impl ResponseLogger {
    pub fn new() -> Self {
        Self
    }
}

impl ParameterLogger for ResponseLogger {
    fn needs_response_body(&self) -> bool {
        true
    }

    fn parameters(&self, _request: &RequestInfo, response: &ResponseInfo) -> Parameters {
        let body = response.body.as_deref().unwrap_or_default();

        let mut parameters = Parameters::new();
        parameters.insert("response".to_string(), serialize_body(body));
        parameters
    }
}

fn serialize_body(body: &[u8]) -> Value {
    let documents: Result<Vec<Value>, _> = Deserializer::from_slice(body)
        .into_iter::<Value>()
        .collect();

    match documents {
        Ok(documents) if !documents.is_empty() => Value::Array(documents),
        _ => Value::String(String::from_utf8_lossy(body).into_owned()),
    }
}
