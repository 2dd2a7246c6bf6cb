#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tokengate::{
    ServerConfig,
    auth::{AuthState, TokenSettings},
    create_app,
    db::{Database, User},
    jwt::SigningKey,
    token::{AuthToken, TokenUsage, now_secs},
};

pub const TEST_PASSWORD: &str = "integration-test-password";
pub const TEST_SALT: &str = "integration-test-salt";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub auth: AuthState,
}

pub async fn setup() -> TestApp {
    setup_with(TokenSettings::default(), true).await
}

/// Build the full application over a fresh in-memory database.
pub async fn setup_with(settings: TokenSettings, username_login: bool) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        signing_key: SigningKey::derive(TEST_PASSWORD, TEST_SALT).expect("Failed to derive key"),
        settings,
        username_login,
    };
    TestApp {
        app: create_app(&config),
        db,
        auth: config.auth_state(),
    }
}

pub async fn create_user(db: &Database, username: &str) -> User {
    let uuid = uuid::Uuid::new_v4().to_string();
    db.users().create(&uuid, username).await.unwrap();
    db.users().get_by_uuid(&uuid).await.unwrap().unwrap()
}

/// Serialize a token of the given usage with `remaining_secs` left before expiry.
pub fn token_for(auth: &AuthState, user: &User, usage: TokenUsage, remaining_secs: u64) -> String {
    let token = AuthToken::new(&user.uuid, now_secs() + remaining_secs, usage, None);
    auth.tokens.serialize(&token).unwrap()
}

pub fn web_cookie(auth: &AuthState, user: &User, remaining_secs: u64) -> String {
    token_for(auth, user, TokenUsage::Web, remaining_secs)
}

/// Replace one character in the middle of the signature segment.
pub fn tamper(token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    let index = chars.len() - 10;
    chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn with_cookie(
    builder: axum::http::request::Builder,
    token: &str,
) -> axum::http::request::Builder {
    builder.header(header::COOKIE, format!("JWT={}", token))
}

pub fn with_bearer(
    builder: axum::http::request::Builder,
    token: &str,
) -> axum::http::request::Builder {
    builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
}

pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

pub fn json_body(builder: axum::http::request::Builder, body: serde_json::Value) -> Request<Body> {
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// All `Set-Cookie` values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Token value of the first session `Set-Cookie`, if any.
pub fn issued_token(response: &Response<Body>) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let value = cookie.split(';').next()?.strip_prefix("JWT=")?;
        (!value.is_empty()).then(|| value.to_string())
    })
}

pub fn is_cleared(response: &Response<Body>) -> bool {
    set_cookies(response)
        .iter()
        .any(|cookie| cookie.starts_with("JWT=;") && cookie.contains("Max-Age=0"))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
