use serde_json::Value;

use super::ParameterLogger;
use crate::parameters::{Parameters, RequestInfo, ResponseInfo};

pub const DEFAULT_REPLACEMENT: &str = "[FILTERED]";

const DEFAULT_FILTERED: [&str; 2] = ["password", "password_confirmation"];

/// Masks sensitive request parameters.
///
/// Emits `params` holding only the filtered keys with their values replaced,
/// which the middleware's deep merge lays over the base `params` field.
/// Keys are matched at any depth. Arrays are re-emitted whole since the
/// merge replaces them.
#[derive(Debug, Clone)]
pub struct FilterParameters {
    filtered: Vec<String>,
    replacement: String,
}

impl FilterParameters {
    pub fn new<I, K>(filtered: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            filtered: filtered.into_iter().map(Into::into).collect(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
        }
    }

    pub fn default_keys() -> &'static [&'static str] {
        &DEFAULT_FILTERED
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    fn is_filtered(&self, key: &str) -> bool {
        self.filtered
            .iter()
            .any(|filtered| filtered.eq_ignore_ascii_case(key))
    }

    /// Only the entries of `params` that change once masked.
    fn masked(&self, params: &Parameters) -> Parameters {
        let mut masked = Parameters::new();
        for (key, value) in params {
            if self.is_filtered(key) {
                masked.insert(key.clone(), Value::String(self.replacement.clone()));
                continue;
            }
            match value {
                Value::Object(inner) => {
                    let inner = self.masked(inner);
                    if !inner.is_empty() {
                        masked.insert(key.clone(), Value::Object(inner));
                    }
                }
                Value::Array(_) => {
                    let copy = self.mask_all(value);
                    if copy != *value {
                        masked.insert(key.clone(), copy);
                    }
                }
                _ => {}
            }
        }
        masked
    }

    fn mask_all(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(key, value)| {
                        let value = if self.is_filtered(key) {
                            Value::String(self.replacement.clone())
                        } else {
                            self.mask_all(value)
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.mask_all(v)).collect()),
            other => other.clone(),
        }
    }
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self::new(DEFAULT_FILTERED)
    }
}

impl ParameterLogger for FilterParameters {
    fn parameters(&self, request: &RequestInfo, _response: &ResponseInfo) -> Parameters {
        let masked = self.masked(&request.params);

        let mut parameters = Parameters::new();
        if !masked.is_empty() {
            parameters.insert("params".to_string(), Value::Object(masked));
        }
        parameters
    }
}
