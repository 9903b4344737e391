use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Database, Wallet};
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub tokens: Arc<TokenCodec>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    rating_level: i64,
    is_admin: bool,
    created_at: String,
    wallet: Option<Wallet>,
}

/// Profile of the caller. Reads the store, so a deleted account is rejected
/// even while its access token is still valid.
async fn me(
    State(state): State<UsersState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(&auth.user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let wallet = state
        .db
        .wallets()
        .get_by_user(&user.id)
        .await
        .db_err("Failed to get wallet")?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        middle_name: user.middle_name,
        avatar_url: user.avatar_url,
        rating_level: user.rating_level,
        is_admin: user.is_admin,
        created_at: user.created_at,
        wallet,
    }))
}
