// File: voltledger-core/src/api/routes/chat.rs

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use voltledger_common::models::Language;
use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::response::{ok, ok_with};
use crate::api::validate::{Checks, Validate, ValidatedJson};
use crate::api::AppState;

const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub message: String,
    pub session_id: Option<Uuid>,
    pub language: Option<Language>,
}

impl Validate for ChatBody {
    fn validate(&self, v: &mut Checks) {
        v.min_len(&self.message, 1, "message").require(
            self.message.chars().count() <= MAX_MESSAGE_CHARS,
            "message",
            "Message is too long",
        );
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    pub text: String,
    pub target_language: Language,
}

impl Validate for TranslateBody {
    fn validate(&self, v: &mut Checks) {
        v.min_len(&self.text, 1, "text");
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<ChatBody>,
) -> ApiResult<impl IntoResponse> {
    let reply = state
        .chat
        .send(who.user_id, body.message.trim(), body.session_id, body.language)
        .await?;
    Ok(ok(reply))
}

pub async fn translate(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidatedJson(body): ValidatedJson<TranslateBody>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.chat.translate(&body.text, body.target_language).await))
}

pub async fn list_sessions(State(state): State<AppState>, AuthUser(who): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.chat.sessions(who.user_id).await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.chat.transcript(who.user_id, id).await?))
}

pub async fn end_session(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.chat.end_session(who.user_id, id).await?;
    Ok(ok_with(json!({}), "Chat session ended"))
}
