// File: voltledger-core/src/api/mod.rs
//
// HTTP surface. Everything lives under /api except the bare /health probe.

pub mod error;
pub mod extract;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;
pub mod validate;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::RateLimitRule;
use rate_limit::{rate_limit, RateLimitTier};
use routes::{auth, carbon, catalog, chat, notifications, payments, usage};

pub use error::{ApiError, ApiResult};
pub use state::{AppState, Collaborators};

fn tier(state: &AppState, rule: RateLimitRule, scope: &'static str) -> RateLimitTier {
    RateLimitTier { limiter: state.limiter.clone(), rule, scope }
}

pub fn router(state: AppState) -> Router {
    let limits = state.config.rate_limits;

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            tier(&state, limits.auth, "auth"),
            rate_limit,
        ))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(auth::list_users))
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/me/push-token", put(auth::register_push_token));

    let token_routes = Router::new()
        .route("/purchase", post(payments::purchase))
        .route_layer(middleware::from_fn_with_state(
            tier(&state, limits.payment, "payment"),
            rate_limit,
        ))
        .route("/", get(catalog::list_tokens).post(catalog::create_token))
        .route("/{id}", put(catalog::update_token));

    let chat_routes = Router::new()
        .route("/", post(chat::send_message))
        .route_layer(middleware::from_fn_with_state(
            tier(&state, limits.chat, "chat"),
            rate_limit,
        ))
        .route("/translate", post(chat::translate))
        .route("/sessions", get(chat::list_sessions))
        .route("/sessions/{id}", get(chat::get_session).delete(chat::end_session));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/tokens", token_routes)
        .nest("/chat", chat_routes)
        .route("/wallet", get(payments::wallet))
        .route("/usage", get(usage::usage_stats).post(usage::record_usage))
        .route("/usage/limits", get(usage::get_limits).put(usage::update_limits))
        .route("/carbon-credits", get(carbon::list_credits).post(carbon::monetize))
        .route("/transactions", get(payments::transactions))
        .route("/payments/callback", get(payments::callback))
        .route("/payments/webhook", post(payments::webhook))
        .route("/companies", get(catalog::list_companies).post(catalog::create_company))
        .route("/companies/{id}", get(catalog::get_company).delete(catalog::delete_company))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/health", get(routes::health))
        .layer(middleware::from_fn_with_state(
            tier(&state, limits.general, "general"),
            rate_limit,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), extract::attach_identity));

    Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health))
        .layer(middleware::from_fn_with_state(state.clone(), error::mask_internal_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
