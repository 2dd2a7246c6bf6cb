//! Tests for session cookie issuance, rotation and logout.

mod common;

use axum::{body::Body, http::StatusCode};
use common::*;
use serde_json::json;
use tokengate::auth::TokenSettings;
use tokengate::token::now_secs;
use tower::ServiceExt;

#[tokio::test]
async fn test_login_issues_session_cookie() {
    let app = setup().await;

    let response = app
        .app
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookies(&response).pop().unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("Max-Age=3540"));

    let token = app.auth.tokens.parse(&issued_token(&response).unwrap()).unwrap();
    assert!(token.is_verified());
    assert!(token.expiration >= now_secs() + 3590);

    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(token.user_id, body["uuid"].as_str().unwrap());
}

#[tokio::test]
async fn test_login_reuses_existing_user() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;

    let response = app
        .app
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();

    let token = app.auth.tokens.parse(&issued_token(&response).unwrap()).unwrap();
    assert_eq!(token.user_id, user.uuid);
}

#[tokio::test]
async fn test_login_rejects_invalid_username() {
    let app = setup().await;

    let response = app
        .app
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "not valid!" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(issued_token(&response).is_none());
}

#[tokio::test]
async fn test_login_route_disabled_by_default() {
    let app = setup_with(TokenSettings::default(), false).await;

    let response = app
        .app
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(issued_token(&response).is_none());
}

#[tokio::test]
async fn test_rotation_below_half_validity() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let old = web_cookie(&app.auth, &user, 25 * 60);
    let old_id = app.auth.tokens.parse(&old).unwrap().token_id;

    let response = app
        .app
        .oneshot(with_cookie(get("/api/me"), &old).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rotated = app.auth.tokens.parse(&issued_token(&response).unwrap()).unwrap();
    assert_ne!(rotated.token_id, old_id);
    assert_eq!(rotated.user_id, user.uuid);
    assert!(rotated.expiration > now_secs() + 59 * 60);
}

#[tokio::test]
async fn test_no_rotation_above_half_validity() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 40 * 60);

    let response = app
        .app
        .oneshot(with_cookie(get("/api/me"), &token).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = setup().await;

    // Login mints a fresh 60 minute token
    let response = app
        .app
        .clone()
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();
    let issued = issued_token(&response).unwrap();
    let first = app.auth.tokens.parse(&issued).unwrap();
    let user = app.db.users().get_by_uuid(&first.user_id).await.unwrap().unwrap();

    // Fresh cookie replayed: nothing to do
    let response = app
        .app
        .clone()
        .oneshot(with_cookie(get("/api/me"), &issued).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(issued_token(&response).is_none());

    // Same session later in its life, with 25 minutes left
    let aged = web_cookie(&app.auth, &user, 25 * 60);
    let response = app
        .app
        .oneshot(with_cookie(get("/api/me"), &aged).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = app.auth.tokens.parse(&issued_token(&response).unwrap()).unwrap();
    assert_ne!(rotated.token_id, first.token_id);
    assert!(rotated.expiration > now_secs() + 25 * 60);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 5 * 60);

    let response = app
        .app
        .oneshot(
            with_cookie(request("POST", "/api/logout"), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(is_cleared(&response));
    // Invalidation wins over rotation
    assert!(issued_token(&response).is_none());
}

#[tokio::test]
async fn test_short_validity_cookie_max_age() {
    let app = setup_with(TokenSettings::new(1, 0).unwrap(), true).await;

    let response = app
        .app
        .oneshot(json_body(
            request("POST", "/api/login"),
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();

    let cookie = set_cookies(&response).pop().unwrap();
    assert!(cookie.contains("Max-Age=1"));
}
