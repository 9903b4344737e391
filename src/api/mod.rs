mod admin;
mod auth;
mod error;
mod users;

use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;

use crate::auth::RefreshCookie;
use crate::db::Database;
use crate::jwt::TokenCodec;
use crate::session::AuthService;

pub use error::{ApiError, ErrorBody, ResultExt};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    service: Arc<AuthService>,
    cookie: Arc<RefreshCookie>,
) -> Router {
    let tokens = service.tokens().clone();

    let auth_state = auth::AuthState { service, cookie };

    let admin_state = admin::AdminState {
        db: db.clone(),
        tokens: tokens.clone(),
    };

    let users_state = users::UsersState { db, tokens };

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(auth_state))
        .nest("/users", users::router(users_state))
        .nest("/admin", admin::router(admin_state))
        .fallback(not_found)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("Not Found").with_path(uri.path())),
    )
}
