// File: voltledger-core/src/api/routes/auth.rs
//
// Accounts: registration, sessions and the caller's profile.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use voltledger_common::models::{Language, PageRequest, ProfileUpdate};
use crate::api::error::ApiResult;
use crate::api::extract::{AdminUser, AuthUser, BearerToken};
use crate::api::response::{created, ok, ok_with};
use crate::api::validate::{Checks, Validate, ValidatedJson, PHONE_RE};
use crate::api::AppState;
use crate::services::Registration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub language: Option<Language>,
}

impl Validate for RegisterBody {
    fn validate(&self, v: &mut Checks) {
        v.email(&self.email, "email")
            .min_len(&self.password, 8, "password")
            .min_len(&self.first_name, 2, "firstName")
            .min_len(&self.last_name, 2, "lastName");
        if let Some(phone) = &self.phone {
            v.require(PHONE_RE.is_match(phone), "phone", "Invalid Nigerian phone number");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

impl Validate for LoginBody {
    fn validate(&self, v: &mut Checks) {
        v.email(&self.email, "email")
            .require(!self.password.is_empty(), "password", "Password is required");
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: String,
}

impl Validate for RefreshBody {
    fn validate(&self, v: &mut Checks) {
        v.require(!self.refresh_token.is_empty(), "refreshToken", "Refresh token is required");
    }
}

impl Validate for ProfileUpdate {
    fn validate(&self, v: &mut Checks) {
        if let Some(n) = &self.first_name {
            v.min_len(n, 2, "firstName");
        }
        if let Some(n) = &self.last_name {
            v.min_len(n, 2, "lastName");
        }
        if let Some(p) = &self.phone {
            v.require(PHONE_RE.is_match(p), "phone", "Invalid Nigerian phone number");
        }
        if let Some(img) = &self.profile_image {
            v.url(img, "profileImage");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PushTokenBody {
    pub token: String,
}

impl Validate for PushTokenBody {
    fn validate(&self, v: &mut Checks) {
        v.require(!self.token.trim().is_empty(), "token", "Device token is required");
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterBody>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .register(Registration {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            phone: body.phone,
            language: body.language,
        })
        .await?;
    Ok(created(user, "User registered successfully"))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginBody>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.users.login(&body.email, &body.password).await?;
    Ok(ok_with(outcome, "Login successful"))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshBody>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.users.refresh(&body.refresh_token).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    _user: AuthUser,
    BearerToken(token): BearerToken,
) -> ApiResult<impl IntoResponse> {
    state.users.logout(&token)?;
    Ok(ok_with(json!({}), "Logged out successfully"))
}

pub async fn me(State(state): State<AppState>, AuthUser(who): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.users.profile(who.user_id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.update_profile(who.user_id, &body).await?;
    Ok(ok_with(user, "Profile updated"))
}

pub async fn register_push_token(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<PushTokenBody>,
) -> ApiResult<impl IntoResponse> {
    state.users.register_push_token(who.user_id, body.token.trim()).await?;
    Ok(ok_with(json!({}), "Push token registered"))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.users.list_users(q.page()).await?))
}
