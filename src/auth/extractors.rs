//! Axum extractors over the identity attached by the authentication filter.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::session::AuthSession;
use super::types::CurrentUser;

/// Extractor for endpoints that require an authenticated caller.
pub struct Auth(pub CurrentUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(Auth)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}

/// Optional authentication extractor - never fails.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// The request's [`AuthSession`], for handlers that log in or out.
/// Fails with a server error when the authentication filter is not installed.
pub struct Session(pub AuthSession);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .map(Session)
            .ok_or(ApiAuthError::new(AuthErrorKind::MissingSession))
    }
}
