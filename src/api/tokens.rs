//! API token management endpoints.
//!
//! - GET `/` - List the caller's API tokens
//! - POST `/` - Create an API token (the serialized token is returned once)
//! - DELETE `/{jti}` - Revoke an API token
//!
//! Only browser sessions may manage API tokens.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiError;
use crate::auth::{Auth, AuthState, CurrentUser};
use crate::token::TokenUsage;

const DEFAULT_TTL_DAYS: u64 = 365;
const MAX_TTL_DAYS: u64 = 3650;
const MAX_DESCRIPTION_LENGTH: usize = 64;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct TokensState {
    pub auth: AuthState,
}

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/", get(list_tokens).post(create_token))
        .route("/{jti}", delete(revoke_token))
        .with_state(state)
}

#[derive(Serialize)]
struct TokenInfo {
    jti: String,
    description: Option<String>,
    expires_at: u64,
}

#[derive(Serialize)]
struct ListTokensResponse {
    tokens: Vec<TokenInfo>,
}

#[derive(Deserialize)]
struct CreateTokenRequest {
    description: String,
    ttl_days: Option<u64>,
}

#[derive(Serialize)]
struct CreateTokenResponse {
    jti: String,
    description: String,
    expires_at: u64,
    token: String,
}

#[derive(Serialize)]
struct RevokeTokenResponse {
    revoked: bool,
}

fn require_web_session(current: &CurrentUser) -> Result<(), ApiError> {
    if current.token.usage != TokenUsage::Web {
        return Err(ApiError::forbidden(
            "API tokens can only be managed from a browser session",
        ));
    }
    Ok(())
}

async fn list_tokens(
    State(state): State<TokensState>,
    Auth(current): Auth,
) -> Result<impl IntoResponse, ApiError> {
    require_web_session(&current)?;

    let mut tokens: Vec<TokenInfo> = state
        .auth
        .tokens
        .load_valid_api_tokens(&current.user)
        .await?
        .into_iter()
        .map(|token| TokenInfo {
            jti: token.token_id,
            description: token.description,
            expires_at: token.expiration,
        })
        .collect();
    tokens.sort_by_key(|t| t.expires_at);

    Ok(Json(ListTokensResponse { tokens }))
}

async fn create_token(
    State(state): State<TokensState>,
    Auth(current): Auth,
    Json(payload): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_web_session(&current)?;

    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::bad_request("Description cannot be empty"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Description cannot be longer than {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }

    let ttl_days = payload.ttl_days.unwrap_or(DEFAULT_TTL_DAYS);
    if !(1..=MAX_TTL_DAYS).contains(&ttl_days) {
        return Err(ApiError::bad_request(format!(
            "Token lifetime must be between 1 and {} days",
            MAX_TTL_DAYS
        )));
    }

    let repository = &state.auth.tokens;
    let taken = repository
        .load_valid_api_tokens(&current.user)
        .await?
        .iter()
        .any(|t| t.description.as_deref() == Some(description.as_str()));
    if taken {
        return Err(ApiError::conflict("A token with this description already exists"));
    }

    let (token, serialized) = repository.issue(
        &current.user,
        TokenUsage::Api,
        Duration::from_secs(ttl_days * SECS_PER_DAY),
        Some(description.clone()),
    )?;
    repository.save_api_token(&current.user, &token).await?;

    info!(user_id = %current.user.uuid, description = %description, "API token created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            jti: token.token_id,
            description,
            expires_at: token.expiration,
            token: serialized,
        }),
    ))
}

async fn revoke_token(
    State(state): State<TokensState>,
    Auth(current): Auth,
    Path(jti): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_web_session(&current)?;

    let revoked = state
        .auth
        .tokens
        .delete_api_token(&current.user, &jti)
        .await?;

    Ok(Json(RevokeTokenResponse { revoked }))
}
