//! Tests for WebSocket upgrade authentication.
//!
//! Requests here carry no upgrade headers, so an authenticated request ends
//! in 400 ("Expected WebSocket upgrade") while refused ones end in 401.

mod common;

use axum::{body::Body, http::StatusCode};
use common::*;
use tokengate::token::TokenUsage;
use tower::ServiceExt;

async fn ws_status(app: &TestApp, cookie: Option<&str>) -> (StatusCode, Vec<String>) {
    let builder = get("/api/ws");
    let builder = match cookie {
        Some(token) => with_cookie(builder, token),
        None => builder,
    };
    let response = app
        .app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookies = set_cookies(&response);
    (response.status(), cookies)
}

#[tokio::test]
async fn test_valid_session_passes_inspection() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 59 * 60);

    let (status, _) = ws_status(&app, Some(&token)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_socket_never_rotates() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 5 * 60);

    let (status, cookies) = ws_status(&app, Some(&token)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(cookies.is_empty());
}

#[tokio::test]
async fn test_missing_cookie_is_refused() {
    let app = setup().await;
    let (status, _) = ws_status(&app, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_cookie_is_refused() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 59 * 60);

    let (status, _) = ws_status(&app, Some(&tamper(&token))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_token_is_refused() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = token_for(&app.auth, &user, TokenUsage::Api, 59 * 60);

    let (status, _) = ws_status(&app, Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_is_refused() {
    let app = setup().await;
    let user = create_user(&app.db, "alice").await;
    let token = web_cookie(&app.auth, &user, 59 * 60);
    app.db.users().delete(user.id).await.unwrap();

    let (status, _) = ws_status(&app, Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
