// File: voltledger-core/src/api/routes/notifications.rs

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::response::{ok, ok_with};
use crate::api::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    pub unread_only: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<NotificationsQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = state
        .notifications
        .list(who.user_id, q.unread_only.unwrap_or(false))
        .await?;
    Ok(ok(items))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.notifications.mark_read(who.user_id, id).await?;
    Ok(ok_with(json!({ "id": id }), "Notification marked as read"))
}
