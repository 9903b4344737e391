//! Session endpoint tests: register, login, refresh rotation, logout.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{
    body_json, cookie_value, create_test_app, get_with_bearer, post_json, post_with_cookie,
    register, set_cookie, tokens, unix_now,
};
use tower::ServiceExt;

#[tokio::test]
async fn test_register_then_fetch_profile() {
    let (app, _db) = create_test_app().await;

    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({ "email": "a@x.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response, "refreshToken").expect("No refresh cookie");
    assert!(!cookie_value(&cookie).is_empty());
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/auth/refresh"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let body = body_json(response).await;
    let access = body["accessToken"].as_str().unwrap();
    // The refresh token never appears in a body
    assert!(body.get("refreshToken").is_none());

    let me = get_with_bearer(&app, "/users/me", Some(access)).await;
    assert_eq!(me.status(), StatusCode::OK);
    let profile = body_json(me).await;
    assert_eq!(profile["email"], "a@x.com");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (app, db) = create_test_app().await;
    register(&app, "a@x.com", "secret1").await;

    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({ "email": "a@x.com", "password": "another1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(set_cookie(&response, "refreshToken").is_none());
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Email already registered");
    assert_eq!(db.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_validation() {
    let (app, db) = create_test_app().await;

    for payload in [
        serde_json::json!({ "email": "a@x.com", "password": "12345" }),
        serde_json::json!({ "email": "", "password": "secret1" }),
        serde_json::json!({ "email": "not-an-email", "password": "secret1" }),
    ] {
        let response = post_json(&app, "/auth/register", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"].is_string());
    }

    assert_eq!(db.users().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_register_with_names() {
    let (app, _db) = create_test_app().await;

    let response = post_json(
        &app,
        "/auth/register",
        serde_json::json!({
            "email": "a@x.com",
            "password": "secret1",
            "firstName": "Alice",
            "lastName": "Smith",
            "middleName": "Jane"
        }),
    )
    .await;
    let access = body_json(response).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    let profile = body_json(get_with_bearer(&app, "/users/me", Some(&access)).await).await;
    assert_eq!(profile["firstName"], "Alice");
    assert_eq!(profile["lastName"], "Smith");
    assert_eq!(profile["middleName"], "Jane");
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (app, _db) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_login() {
    let (app, _db) = create_test_app().await;
    register(&app, "a@x.com", "secret1").await;

    let response = post_json(
        &app,
        "/auth/login",
        serde_json::json!({ "email": "a@x.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "refreshToken").is_some());
    let body = body_json(response).await;
    let access = body["accessToken"].as_str().unwrap();

    let claims = tokens().verify_access_token(access).unwrap();
    assert!(!claims.is_admin);
    assert_eq!(claims.rating_level, 3);
}

#[tokio::test]
async fn test_login_unknown_email() {
    let (app, _db) = create_test_app().await;

    let response = post_json(
        &app,
        "/auth/login",
        serde_json::json!({ "email": "nobody@x.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "refreshToken").is_none());
    let body = body_json(response).await;
    assert_eq!(
        body,
        serde_json::json!({ "error": { "message": "Invalid credentials" } })
    );
}

#[tokio::test]
async fn test_login_wrong_password_matches_unknown_email() {
    let (app, _db) = create_test_app().await;
    register(&app, "a@x.com", "secret1").await;

    let wrong_password = post_json(
        &app,
        "/auth/login",
        serde_json::json!({ "email": "a@x.com", "password": "wrong12" }),
    )
    .await;
    let unknown_email = post_json(
        &app,
        "/auth/login",
        serde_json::json!({ "email": "b@x.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(wrong_password.status(), unknown_email.status());
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

#[tokio::test]
async fn test_refresh_rotates_cookie() {
    let (app, _db) = create_test_app().await;
    let (_, refresh) = register(&app, "a@x.com", "secret1").await;

    let response = post_with_cookie(
        &app,
        "/auth/refresh",
        Some(&format!("refreshToken={}", refresh)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response, "refreshToken").unwrap();
    let rotated = cookie_value(&cookie).to_string();
    assert_ne!(rotated, refresh);

    let body = body_json(response).await;
    let access = body["accessToken"].as_str().unwrap();
    let me = get_with_bearer(&app, "/users/me", Some(access)).await;
    assert_eq!(me.status(), StatusCode::OK);

    let codec = tokens();
    let old = codec.verify_refresh_token(&refresh).unwrap();
    let new = codec.verify_refresh_token(&rotated).unwrap();
    assert_eq!(old.sub, new.sub);
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let (app, _db) = create_test_app().await;

    let response = post_with_cookie(&app, "/auth/refresh", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "No refresh token");
}

#[tokio::test]
async fn test_refresh_with_expired_token_clears_cookie() {
    let (app, db) = create_test_app().await;
    let identity = common::create_identity(&db, "a@x.com", false).await;

    let codec = tokens();
    let issued_at = unix_now() - codec.refresh_ttl().as_secs() - 60;
    let expired = codec
        .issue_refresh_token_at(&identity.id, issued_at)
        .unwrap()
        .token;

    let response = post_with_cookie(
        &app,
        "/auth/refresh",
        Some(&format!("refreshToken={}", expired)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = set_cookie(&response, "refreshToken").expect("Cookie not cleared");
    assert_eq!(cookie_value(&cookie), "");
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/auth/refresh"));

    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_refresh_rejects_access_token_in_cookie() {
    let (app, _db) = create_test_app().await;
    let (access, _) = register(&app, "a@x.com", "secret1").await;

    let response = post_with_cookie(
        &app,
        "/auth/refresh",
        Some(&format!("refreshToken={}", access)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "refreshToken").is_some());
}

#[tokio::test]
async fn test_refresh_for_deleted_user() {
    let (app, db) = create_test_app().await;
    let (access, refresh) = register(&app, "a@x.com", "secret1").await;
    let user_id = tokens().verify_access_token(&access).unwrap().sub;

    db.users().delete(&user_id).await.unwrap();

    let response = post_with_cookie(
        &app,
        "/auth/refresh",
        Some(&format!("refreshToken={}", refresh)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _db) = create_test_app().await;

    let response = post_with_cookie(&app, "/auth/logout", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response, "refreshToken").unwrap();
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/auth/refresh"));

    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "success": true }));
}

#[tokio::test]
async fn test_health() {
    let (app, _db) = create_test_app().await;

    let response = get_with_bearer(&app, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
