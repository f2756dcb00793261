// File: voltledger-core/src/api/extract.rs

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use voltledger_common::models::{Identity, Role};
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::auth::{bearer_token, require_role};

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Resolves the bearer token once, early, so the rate limiter can key on
/// the user. Never rejects; `AuthUser` does that for routes that need it.
pub async fn attach_identity(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Ok(token) = bearer_token(authorization(request.headers())) {
        if let Ok(identity) = state.verifier.verify(token).await {
            request.extensions_mut().insert(identity);
        }
    }
    next.run(request).await
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(identity.clone()));
        }
        // Re-verify to surface the precise reason.
        let token = bearer_token(authorization(&parts.headers))?;
        let identity = state.verifier.verify(token).await?;
        Ok(AuthUser(identity))
    }
}

/// An authenticated caller holding the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&identity, &[Role::Admin])?;
        Ok(AdminUser(identity))
    }
}

/// The raw bearer token, for logout.
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(authorization(&parts.headers)).map_err(ApiError::from)?;
        Ok(BearerToken(token.to_string()))
    }
}
