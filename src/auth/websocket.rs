//! Connection-time authentication for WebSocket upgrades.
//!
//! Sockets are authenticated once, from the raw `Cookie` header, before the
//! upgrade is accepted. Only WEB tokens are honored and any failure refuses
//! the connection. Nothing is ever written back: a socket never rotates its
//! session cookie.

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use super::channel::{Channel, accepts};
use super::cookie::{TOKEN_COOKIE_NAME, get_cookie};
use super::repository::TokenStatus;
use super::state::AuthState;
use super::types::CurrentUser;

/// Why a socket upgrade was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsRejection {
    MissingToken,
    MalformedToken,
    WrongUsage,
    InvalidToken,
    UnknownUser,
    /// Storage failure while validating
    Internal,
}

impl IntoResponse for WsRejection {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let (status, message) = match self {
            WsRejection::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
            _ => (StatusCode::UNAUTHORIZED, "Not authenticated"),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Authenticate a socket upgrade request.
pub async fn inspect(headers: &HeaderMap, state: &AuthState) -> Result<CurrentUser, WsRejection> {
    let raw = get_cookie(headers, TOKEN_COOKIE_NAME).ok_or(WsRejection::MissingToken)?;

    let token = state.tokens.parse(raw).map_err(|e| {
        warn!(error = %e, "Unable to parse socket session token");
        WsRejection::MalformedToken
    })?;

    if !accepts(token.usage, Channel::Cookie) {
        warn!(user_id = %token.user_id, usage = token.usage.as_str(), "Refusing socket token");
        return Err(WsRejection::WrongUsage);
    }

    let user = state
        .db
        .users()
        .get_by_uuid(&token.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up socket user");
            WsRejection::Internal
        })?
        .ok_or(WsRejection::UnknownUser)?;

    match state.tokens.check(&user, &token).await {
        Ok(TokenStatus::Valid) => Ok(CurrentUser { user, token }),
        Ok(status) => {
            warn!(user_id = %user.uuid, status = ?status, "Refusing socket token");
            Err(WsRejection::InvalidToken)
        }
        Err(e) => {
            error!(error = %e, "Failed to validate socket token");
            Err(WsRejection::Internal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::state::TokenSettings;
    use crate::db::Database;
    use crate::jwt::SigningKey;
    use crate::token::{AuthToken, TokenUsage, now_secs};
    use axum::http::{HeaderValue, header};
    use std::time::Duration;

    async fn setup() -> AuthState {
        let db = Database::open(":memory:").await.unwrap();
        db.users().create("uuid-alice", "alice").await.unwrap();
        let key = SigningKey::derive("password", "salt").unwrap();
        AuthState::new(db, &key, TokenSettings::default())
    }

    fn cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    async fn issue(state: &AuthState, usage: TokenUsage) -> String {
        let user = state.db.users().get_by_uuid("uuid-alice").await.unwrap().unwrap();
        state
            .tokens
            .issue(&user, usage, Duration::from_secs(600), None)
            .unwrap()
            .1
    }

    #[tokio::test]
    async fn test_valid_web_cookie_is_accepted() {
        let state = setup().await;
        let text = issue(&state, TokenUsage::Web).await;

        let current = inspect(&cookie(&format!("theme=dark; JWT={}", text)), &state)
            .await
            .unwrap();

        assert_eq!(current.user.username, "alice");
    }

    #[tokio::test]
    async fn test_missing_cookie_is_refused() {
        let state = setup().await;
        assert_eq!(
            inspect(&HeaderMap::new(), &state).await.unwrap_err(),
            WsRejection::MissingToken
        );
        assert_eq!(
            inspect(&cookie("JWT="), &state).await.unwrap_err(),
            WsRejection::MissingToken
        );
    }

    #[tokio::test]
    async fn test_api_token_is_refused() {
        let state = setup().await;
        let text = issue(&state, TokenUsage::Api).await;

        assert_eq!(
            inspect(&cookie(&format!("JWT={}", text)), &state)
                .await
                .unwrap_err(),
            WsRejection::WrongUsage
        );
    }

    #[tokio::test]
    async fn test_tampered_and_expired_tokens_are_refused() {
        let state = setup().await;
        let text = issue(&state, TokenUsage::Web).await;
        assert_eq!(
            inspect(&cookie(&format!("JWT={}x", text)), &state)
                .await
                .unwrap_err(),
            WsRejection::InvalidToken
        );

        let expired = AuthToken::new("uuid-alice", now_secs() - 1, TokenUsage::Web, None);
        let text = state.tokens.serialize(&expired).unwrap();
        assert_eq!(
            inspect(&cookie(&format!("JWT={}", text)), &state)
                .await
                .unwrap_err(),
            WsRejection::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_malformed_token_is_refused() {
        let state = setup().await;
        assert_eq!(
            inspect(&cookie("JWT=not.a.jwt"), &state).await.unwrap_err(),
            WsRejection::MalformedToken
        );
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            WsRejection::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WsRejection::Internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
