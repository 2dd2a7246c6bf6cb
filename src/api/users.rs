//! Session endpoints.
//!
//! - POST `/login` - Username-only login (development mode, opt-in)
//! - POST `/logout` - Clear the session cookie
//! - GET `/me` - Current caller

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, OptionalAuth, Session};
use crate::db::Database;
use crate::token::TokenUsage;

const MAX_USERNAME_LENGTH: usize = 32;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub username_login: bool,
}

pub fn router(state: UsersState) -> Router {
    let router = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me));

    let router = if state.username_login {
        router.route("/login", post(login))
    } else {
        router
    };

    router.with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
}

#[derive(Serialize)]
struct UserResponse {
    uuid: String,
    username: String,
}

#[derive(Serialize)]
struct MeResponse {
    uuid: String,
    username: String,
    usage: TokenUsage,
    expires_at: u64,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username cannot be longer than {} characters",
            MAX_USERNAME_LENGTH
        )));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

/// Log in by username, creating the user on first sight.
/// The session cookie is minted when the response is committed.
async fn login(
    State(state): State<UsersState>,
    Session(session): Session,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;

    let existing = state
        .db
        .users()
        .get_by_username(username)
        .await
        .db_err("Failed to get user")?;

    let user = match existing {
        Some(user) => user,
        None => {
            let uuid = uuid::Uuid::new_v4().to_string();
            state
                .db
                .users()
                .create(&uuid, username)
                .await
                .db_err("Failed to create user")?;
            info!(user_id = %uuid, username = %username, "User created");
            state
                .db
                .users()
                .get_by_uuid(&uuid)
                .await
                .db_err("Failed to get user")?
                .ok_or_else(|| ApiError::db_error("Failed to get user", "missing after insert"))?
        }
    };

    let response = UserResponse {
        uuid: user.uuid.clone(),
        username: user.username.clone(),
    };
    info!(user_id = %user.uuid, username = %user.username, "User logged in");
    session.login(user)?;

    Ok(Json(response))
}

async fn logout(
    OptionalAuth(current): OptionalAuth,
    Session(session): Session,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(current) = current {
        info!(user_id = %current.user.uuid, username = %current.user.username, "User logged out");
    }
    session.invalidate_authentication()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(Auth(current): Auth) -> impl IntoResponse {
    Json(MeResponse {
        uuid: current.user.uuid,
        username: current.user.username,
        usage: current.token.usage,
        expires_at: current.token.expiration,
    })
}
