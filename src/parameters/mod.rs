//! The per-request parameter mapping and the request/response views that
//! parameter loggers read from.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Query},
    http::{header, response::Parts, HeaderMap, Request, StatusCode},
};
use futures::stream;
use http_body::Body as _;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use tracing::warn;

pub mod nested;

/// Ordered field name -> value mapping emitted once per request.
pub type Parameters = Map<String, Value>;

/// Merge `incoming` into `base`.
///
/// When both sides hold an object under the same key the objects are merged
/// recursively; any other collision is won by `incoming`.
pub fn deep_merge(base: &mut Parameters, incoming: Parameters) {
    for (key, new_value) in incoming {
        match (base.get_mut(&key), new_value) {
            (Some(Value::Object(existing)), Value::Object(new_object)) => {
                deep_merge(existing, new_object);
            }
            (_, new_value) => {
                base.insert(key, new_value);
            }
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// What loggers get to see of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub params: Parameters,
    pub host: String,
    pub headers: HeaderMap,
    pub peer_addr: Option<SocketAddr>,
}

impl RequestInfo {
    /// Reads everything but the body. `params` holds the query string.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let params = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
            .map(|Query(pairs)| nested::decode(pairs))
            .unwrap_or_default();

        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(strip_port)
            .or_else(|| request.uri().host().map(str::to_string))
            .unwrap_or_default();

        let peer_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            params,
            host,
            headers: request.headers().clone(),
            peer_addr,
        }
    }

    /// Like [`RequestInfo::from_request`], adding the pairs of a
    /// form-encoded body to `params`.
    ///
    /// The body is read only when its length is known and at most `limit`
    /// bytes, and handed back with the request either way. A body that
    /// fails while being read is handed back as one that fails the same
    /// way.
    pub async fn capture(request: Request<Body>, limit: usize) -> (Request<Body>, Self) {
        let mut info = Self::from_request(&request);
        if !is_form(request.headers()) {
            return (request, info);
        }

        let (parts, body) = request.into_parts();
        let fits = body
            .size_hint()
            .upper()
            .is_some_and(|len| len <= limit as u64);
        if !fits {
            return (Request::from_parts(parts, body), info);
        }

        let body = match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => {
                match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes) {
                    Ok(pairs) => {
                        for (key, value) in pairs {
                            nested::insert(&mut info.params, &key, Value::String(value));
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to decode form parameters"),
                }
                Body::from(bytes)
            }
            Err(err) => {
                warn!(error = %err, "Failed to read form body for logging");
                Body::from_stream(stream::once(async move { Err::<Bytes, _>(err) }))
            }
        };

        (Request::from_parts(parts, body), info)
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

fn strip_port(host: &str) -> String {
    // Bracketed IPv6 literals keep their brackets, lose the port.
    if let Some(end) = host.find(']') {
        return host[..=end].to_string();
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host.to_string(),
    }
}

/// What loggers get to see of the outcome. For failures the body holds the
/// error message.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ResponseInfo {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers.clone(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_merge_combines_nested_objects() {
        let mut base = object(json!({"k": {"a": 1}}));
        deep_merge(&mut base, object(json!({"k": {"b": 2}})));
        assert_eq!(Value::Object(base), json!({"k": {"a": 1, "b": 2}}));
    }

    #[test]
    fn test_merge_recurses_below_first_level() {
        let mut base = object(json!({"k": {"inner": {"a": 1}, "keep": true}}));
        deep_merge(&mut base, object(json!({"k": {"inner": {"b": 2}}})));
        assert_eq!(
            Value::Object(base),
            json!({"k": {"inner": {"a": 1, "b": 2}, "keep": true}})
        );
    }

    #[test]
    fn test_merge_non_object_overwrites() {
        let mut base = object(json!({"k": {"a": 1}, "status": 200}));
        deep_merge(&mut base, object(json!({"k": "flat", "status": 201})));
        assert_eq!(Value::Object(base), json!({"k": "flat", "status": 201}));
    }

    #[test]
    fn test_merge_object_replaces_scalar() {
        let mut base = object(json!({"k": 1}));
        deep_merge(&mut base, object(json!({"k": {"b": 2}})));
        assert_eq!(Value::Object(base), json!({"k": {"b": 2}}));
    }

    #[test]
    fn test_merge_keeps_insertion_order() {
        let mut base = object(json!({"status": 200, "method": "GET"}));
        deep_merge(&mut base, object(json!({"extra": 1})));
        let keys: Vec<&String> = base.keys().collect();
        assert_eq!(keys, ["status", "method", "extra"]);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.005_1), 0.01);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_request_info_reads_query_and_host() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users?page=2&sort=name")
            .header(header::HOST, "api.example.com:8080")
            .body(())
            .unwrap();

        let info = RequestInfo::from_request(&request);
        assert_eq!(info.method, "POST");
        assert_eq!(info.path, "/api/v1/users");
        assert_eq!(info.host, "api.example.com");
        assert_eq!(
            Value::Object(info.params),
            json!({"page": "2", "sort": "name"})
        );
        assert!(info.peer_addr.is_none());
    }

    #[test]
    fn test_query_brackets_are_nested() {
        let request = Request::builder()
            .uri("/?ids[]=1&ids[]=2&user[name]=ann")
            .body(())
            .unwrap();

        let info = RequestInfo::from_request(&request);
        assert_eq!(
            Value::Object(info.params),
            json!({"ids": ["1", "2"], "user": {"name": "ann"}})
        );
    }

    #[tokio::test]
    async fn test_form_body_params_are_merged_and_body_kept() {
        let request = Request::builder()
            .method("POST")
            .uri("/session?remember=1")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("user%5Bname%5D=ann&password=hunter2"))
            .unwrap();

        let (request, info) = RequestInfo::capture(request, 1024).await;
        assert_eq!(
            Value::Object(info.params),
            json!({"remember": "1", "user": {"name": "ann"}, "password": "hunter2"})
        );

        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"user%5Bname%5D=ann&password=hunter2");
    }

    #[tokio::test]
    async fn test_form_body_over_limit_is_not_read() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("password=hunter2"))
            .unwrap();

        let (request, info) = RequestInfo::capture(request, 4).await;
        assert!(info.params.is_empty());

        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"password=hunter2");
    }

    #[tokio::test]
    async fn test_json_body_is_left_alone() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"password":"x"}"#))
            .unwrap();

        let (_, info) = RequestInfo::capture(request, 1024).await;
        assert!(info.params.is_empty());
    }

    #[test]
    fn test_strip_port_handles_ipv6() {
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
        assert_eq!(strip_port("localhost"), "localhost");
    }
}
