#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use std::sync::Arc;
use tower::ServiceExt;
use walletd::{
    ServerConfig, create_app,
    db::{DEFAULT_RATING_LEVEL, Database, Identity},
    jwt::TokenCodec,
    password::{Argon2Hasher, PasswordHasher},
    store::NewIdentity,
};

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-at-least-32-bytes";

/// Cheap Argon2 parameters so tests don't spend seconds hashing.
pub fn fast_hasher() -> Arc<Argon2Hasher> {
    Arc::new(Argon2Hasher::with_params(64, 1, 1).expect("Invalid Argon2 params"))
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        hasher: fast_hasher(),
        ..ServerConfig::new(db, JWT_SECRET.to_vec())
    }
}

pub fn tokens() -> TokenCodec {
    TokenCodec::new(JWT_SECRET)
}

pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    (create_app(&test_config(db.clone())), db)
}

pub fn unix_now() -> u64 {
    walletd::jwt::unix_now().expect("Clock before epoch")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// The full `Set-Cookie` value for the named cookie.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}

/// The value part of a `Set-Cookie` header (between `=` and the first `;`).
pub fn cookie_value(set_cookie: &str) -> &str {
    let pair = set_cookie.split(';').next().unwrap_or("");
    pair.split_once('=').map(|(_, v)| v).unwrap_or("")
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_with_cookie(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_with_bearer(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Register through the API. Returns (access token, refresh token).
pub async fn register(app: &Router, email: &str, password: &str) -> (String, String) {
    let response = post_json(
        app,
        "/auth/register",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert!(response.status().is_success(), "register failed");

    let cookie = set_cookie(&response, "refreshToken").expect("No refresh cookie");
    let refresh = cookie_value(&cookie).to_string();
    let body = body_json(response).await;
    let access = body["accessToken"].as_str().expect("No access token").to_string();
    (access, refresh)
}

/// Insert an identity straight into the store, bypassing the API.
pub async fn create_identity(db: &Database, email: &str, is_admin: bool) -> Identity {
    let hash = fast_hasher().hash("secret1").await.unwrap();
    let identity = db
        .users()
        .create(&NewIdentity {
            email: email.to_string(),
            password_hash: hash,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            middle_name: None,
            rating_level: DEFAULT_RATING_LEVEL,
            is_admin,
        })
        .await
        .unwrap();
    db.wallets().create_for_user(&identity.id).await.unwrap();
    identity
}
