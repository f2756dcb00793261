pub mod auth;
pub mod carbon;
pub mod catalog;
pub mod chat;
pub mod notifications;
pub mod payments;
pub mod usage;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::api::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database) = match &state.database {
        None => (StatusCode::OK, "memory"),
        Some(db) => match db.ping().await {
            Ok(()) => (StatusCode::OK, "up"),
            Err(e) => {
                warn!("health check: database unreachable: {:?}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "down")
            }
        },
    };
    let body = json!({
        "success": status == StatusCode::OK,
        "data": {
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "database": database,
            "environment": state.config.environment.to_string(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    });
    (status, Json(body))
}
