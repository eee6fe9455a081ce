use axum::{extract::State, http::StatusCode, response::Json};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::middleware::ErrorSignal;
use crate::{timings, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Stand-in for a database round trip.
async fn simulated_query() {
    let millis = rand::thread_rng().gen_range(2..12);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

pub async fn list_users(State(_state): State<AppState>) -> Json<Value> {
    info!("List users requested");

    timings::measure(simulated_query()).await;
    if let Some(db) = timings::current() {
        debug!(db_ms = db.read_ms(), "Users loaded");
    }

    let users = vec![
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        },
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Jane Smith".to_string(),
            email: "jane@example.com".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    ];

    Json(json!({
        "users": users,
        "total": users.len(),
    }))
}

pub async fn create_user(
    State(_state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ErrorSignal> {
    if payload.name.is_empty() || payload.email.is_empty() {
        warn!("Invalid user creation request: missing name or email");
        return Err(ErrorSignal::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "name and email are required",
        ));
    }

    timings::measure(simulated_query()).await;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": user,
            "message": "User created successfully",
        })),
    ))
}
