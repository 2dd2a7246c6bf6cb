//! Authentication error types.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use super::cookie::clear_cookie;
use crate::jwt::JwtError;

/// Failures of the token layer that are not a plain "not authenticated".
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] JwtError),
    /// A persisted API token no longer parses: storage corruption
    #[error("Stored API token {key:?} for user {user_id} could not be parsed")]
    CorruptStoredToken { user_id: String, key: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid cookie header: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),
    /// The token cookie decision was already applied to the response
    #[error("Unable to change authentication, the response is already committed")]
    ResponseCommitted,
}

/// Internal auth error kind used by the filter and extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidSignature,
    MissingSession,
    Internal,
}

/// API authentication errors (returns JSON, clears the token cookie on 401).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.kind {
            AuthErrorKind::NotAuthenticated | AuthErrorKind::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::MissingSession | AuthErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::InvalidSignature => "Invalid token signature",
            AuthErrorKind::MissingSession => "Authentication filter not installed",
            AuthErrorKind::Internal => "Internal authentication error",
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::{HeaderValue, StatusCode};
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let status = self.status_code();
        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = HeaderValue::from_str(&clear_cookie()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}
