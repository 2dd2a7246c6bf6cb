//! Request-side token validation middleware.
//!
//! Install with `axum::middleware::from_fn_with_state(auth_state, authenticate)`.
//! For every request the filter picks at most one candidate token (session
//! cookie first, then the bearer header), validates it and either rejects the
//! request, attaches the caller's identity, or lets it through anonymously.
//! After the handler returns, the request's [`AuthSession`] is committed.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, Span, debug, error, info_span, warn};

use super::channel::{Channel, accepts, bearer_token};
use super::cookie::{TOKEN_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthError, AuthErrorKind};
use super::repository::TokenStatus;
use super::session::AuthSession;
use super::state::AuthState;
use super::types::CurrentUser;
use crate::jwt::TokenCodec;
use crate::token::AuthToken;

/// A parsed token and the channel it arrived on.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub token: AuthToken,
    pub channel: Channel,
}

#[derive(Debug)]
pub(crate) enum FilterOutcome {
    /// Proceed without identity; `clear_cookie` when the session cookie is dead
    Anonymous { clear_cookie: bool },
    /// Tampered credential: 401 without running the handler
    Reject,
    Accept(CurrentUser),
}

/// Pick the candidate token. Malformed tokens and tokens on the wrong
/// channel are skipped, never rejected.
pub(crate) fn extract_candidate(headers: &HeaderMap, codec: &TokenCodec) -> Option<Candidate> {
    if let Some(raw) = get_cookie(headers, TOKEN_COOKIE_NAME) {
        match codec.parse(raw) {
            Ok(token) if accepts(token.usage, Channel::Cookie) => {
                return Some(Candidate {
                    token,
                    channel: Channel::Cookie,
                });
            }
            Ok(token) => {
                warn!(user_id = %token.user_id, usage = token.usage.as_str(), "Ignoring token presented via cookie");
            }
            Err(e) => warn!(error = %e, "Unable to parse session cookie"),
        }
    }

    let raw = bearer_token(headers)?;
    match codec.parse(raw) {
        Ok(token) if accepts(token.usage, Channel::Header) => Some(Candidate {
            token,
            channel: Channel::Header,
        }),
        Ok(token) => {
            warn!(user_id = %token.user_id, usage = token.usage.as_str(), "Ignoring token presented via Authorization header");
            None
        }
        Err(e) => {
            warn!(error = %e, "Unable to parse bearer token");
            None
        }
    }
}

/// Validate a candidate against the user directory and revocation lists.
pub(crate) async fn evaluate(
    candidate: Option<Candidate>,
    state: &AuthState,
) -> Result<FilterOutcome, AuthError> {
    let Some(Candidate { token, channel }) = candidate else {
        return Ok(FilterOutcome::Anonymous {
            clear_cookie: false,
        });
    };

    if !token.is_verified() {
        warn!(user_id = %token.user_id, channel = ?channel, "Token signature verification failed");
        return Ok(FilterOutcome::Reject);
    }

    let dead = FilterOutcome::Anonymous {
        clear_cookie: channel == Channel::Cookie,
    };

    let Some(user) = state.db.users().get_by_uuid(&token.user_id).await? else {
        debug!(user_id = %token.user_id, "Token refers to unknown user");
        return Ok(dead);
    };

    match state.tokens.check(&user, &token).await? {
        TokenStatus::Valid => Ok(FilterOutcome::Accept(CurrentUser { user, token })),
        TokenStatus::SignatureInvalid => Ok(FilterOutcome::Reject),
        status => {
            debug!(user_id = %user.uuid, status = ?status, "Token no longer valid");
            Ok(dead)
        }
    }
}

/// Authentication middleware.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let candidate = extract_candidate(request.headers(), state.tokens.codec());

    let outcome = match evaluate(candidate, &state).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Token validation failed");
            return ApiAuthError::new(AuthErrorKind::Internal).into_response();
        }
    };

    let (accepted, stale_cookie) = match outcome {
        FilterOutcome::Reject => {
            return ApiAuthError::new(AuthErrorKind::InvalidSignature).into_response();
        }
        FilterOutcome::Anonymous { clear_cookie } => (None, clear_cookie),
        FilterOutcome::Accept(current) => (Some(current), false),
    };

    let session = AuthSession::new(
        state.tokens.clone(),
        state.settings,
        accepted.as_ref(),
        stale_cookie,
    );
    request.extensions_mut().insert(session.clone());

    let span = match accepted {
        Some(current) => {
            let span = info_span!(
                "request",
                user_id = %current.user.uuid,
                username = %current.user.username
            );
            request.extensions_mut().insert(current);
            span
        }
        None => Span::none(),
    };

    let mut response = next.run(request).instrument(span).await;

    if let Err(e) = session.commit(response.headers_mut()) {
        error!(error = %e, "Unable to update session cookie");
        return ApiAuthError::new(AuthErrorKind::Internal).into_response();
    }

    response
}
