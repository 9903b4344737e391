//! Session endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Start a session with email and password
//! - POST `/refresh` - Rotate the refresh cookie and issue a new access token
//! - POST `/logout` - Clear the refresh cookie
//!
//! Access tokens are returned in the JSON body; refresh tokens only ever
//! appear in `Set-Cookie`.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ErrorBody};
use crate::auth::RefreshCookie;
use crate::session::{AuthError, AuthService, RegisterInput, TokenPair};

#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
    pub cookie: Arc<RefreshCookie>,
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    middle_name: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

/// Body carries the access token, the cookie carries the refresh token.
fn session_response(cookie: &RefreshCookie, tokens: TokenPair) -> Response {
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie.set(&tokens.refresh_token))],
        Json(TokenResponse {
            access_token: tokens.access_token,
        }),
    )
        .into_response()
}

async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    let outcome = state
        .service
        .register(RegisterInput {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            middle_name: payload.middle_name,
        })
        .await?;

    Ok(session_response(&state.cookie, outcome.tokens))
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    let outcome = state
        .service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(session_response(&state.cookie, outcome.tokens))
}

async fn refresh(State(state): State<AuthState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let refresh_token = state
        .cookie
        .read(&headers)
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    match state.service.refresh(refresh_token).await {
        Ok(tokens) => Ok(session_response(&state.cookie, tokens)),
        // The cookie is useless from here on, so drop it client-side too
        Err(e @ AuthError::InvalidRefreshToken) => Ok((
            StatusCode::UNAUTHORIZED,
            [(SET_COOKIE, state.cookie.clear())],
            ErrorBody::json(e.to_string()),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn logout(State(state): State<AuthState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(SET_COOKIE, state.cookie.clear())],
        Json(state.service.logout()),
    )
}
