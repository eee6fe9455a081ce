use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use request_logger::config::{AppConfig, IncludedLogger};
use request_logger::{create_app, AppState, Notification};

const INSTRUMENTATION_KEY: &str = "demo_api.request";

async fn spawn_server() -> (String, broadcast::Receiver<Notification>) {
    let mut config = AppConfig::default();
    config.request_logging.instrumentation_key = Some(INSTRUMENTATION_KEY.to_string());
    config.request_logging.include = vec![IncludedLogger::Response, IncludedLogger::ClientEnv];

    let state = AppState::new(config);
    let notifications = state.notifications.subscribe();
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (format!("http://{}", addr), notifications)
}

async fn next_record(rx: &mut broadcast::Receiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no request record published")
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base_url, mut records) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "request-logger");

    let record = next_record(&mut records).await;
    assert_eq!(record.name, INSTRUMENTATION_KEY);
    assert_eq!(record.payload["status"], 200);
    assert_eq!(record.payload["method"], "GET");
    assert_eq!(record.payload["path"], "/health");
    assert_eq!(record.payload["host"], "127.0.0.1");
    assert_eq!(record.payload["ip"], "127.0.0.1");
    assert_eq!(record.payload["response"][0]["status"], "healthy");
}

#[tokio::test]
async fn test_users_list_records_db_time() {
    let (base_url, mut records) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/users?page=1", base_url))
        .header("user-agent", "integration-test")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert!(body["users"].is_array());
    assert_eq!(body["total"], 2);

    let record = next_record(&mut records).await.payload;
    assert_eq!(record["params"], json!({"page": "1"}));
    assert_eq!(record["ua"], "integration-test");

    let total = record["time"]["total"].as_f64().unwrap();
    let db = record["time"]["db"].as_f64().unwrap();
    assert!(db >= 2.0, "db {db}");
    assert!(total >= db, "total {total} db {db}");
}

#[tokio::test]
async fn test_invalid_user_is_logged_with_signal_status() {
    let (base_url, mut records) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/users", base_url))
        .json(&json!({"name": "", "email": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "name and email are required");

    let record = next_record(&mut records).await.payload;
    assert_eq!(record["status"], 422);
    assert_eq!(record["method"], "POST");
    assert_eq!(record["response"], "name and email are required");
}

#[tokio::test]
async fn test_created_user_is_logged() {
    let (base_url, mut records) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/users", base_url))
        .json(&json!({"name": "Ann", "email": "ann@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let record = next_record(&mut records).await.payload;
    assert_eq!(record["status"], 201);
    assert_eq!(record["response"][0]["user"]["name"], "Ann");
}
