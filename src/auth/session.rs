//! Response-side token handling.
//!
//! Every filtered request carries an [`AuthSession`]. Handlers may log a user
//! in or invalidate the session through it; once the handler returns, the
//! filter commits the session exactly once. Committing computes a single
//! [`Decision`] from the request's authentication state and then applies it
//! to the outgoing headers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::{HeaderMap, HeaderValue, header};
use tracing::debug;

use super::cookie::{clear_cookie, session_cookie};
use super::errors::AuthError;
use super::repository::TokenRepository;
use super::state::TokenSettings;
use super::types::CurrentUser;
use crate::db::User;
use crate::token::{AuthToken, TokenUsage, now_secs};

/// What to do with the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Replace the cookie with an empty, immediately expiring one
    Clear,
    /// Mint a fresh WEB token for the user
    Issue(User),
    /// Leave the client's cookie alone. Always the outcome for a request
    /// authenticated by an API token, however close it is to expiry.
    Keep,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Inbound token that authenticated the request
    inbound: Option<AuthToken>,
    user: Option<User>,
    /// The request presented a dead session cookie
    stale_cookie: bool,
    invalidated: bool,
    committed: bool,
}

/// Request-scoped authentication handle.
#[derive(Clone)]
pub struct AuthSession {
    state: Arc<Mutex<SessionState>>,
    tokens: Arc<TokenRepository>,
    settings: TokenSettings,
}

impl AuthSession {
    pub(crate) fn new(
        tokens: Arc<TokenRepository>,
        settings: TokenSettings,
        accepted: Option<&CurrentUser>,
        stale_cookie: bool,
    ) -> Self {
        let state = SessionState {
            inbound: accepted.map(|current| current.token.clone()),
            user: accepted.map(|current| current.user.clone()),
            stale_cookie,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            tokens,
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The user the response will be issued for, if any.
    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Authenticate the session as `user`. A session token is minted on commit.
    pub fn login(&self, user: User) -> Result<(), AuthError> {
        let mut state = self.lock();
        if state.committed {
            return Err(AuthError::ResponseCommitted);
        }
        state.user = Some(user);
        state.invalidated = false;
        Ok(())
    }

    /// Drop the session. The client's cookie is cleared on commit.
    pub fn invalidate_authentication(&self) -> Result<(), AuthError> {
        let mut state = self.lock();
        if state.committed {
            return Err(AuthError::ResponseCommitted);
        }
        state.user = None;
        state.invalidated = true;
        Ok(())
    }

    /// Decide and apply the cookie outcome. Later calls are no-ops.
    pub fn commit(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let decision = {
            let mut state = self.lock();
            if state.committed {
                return Ok(());
            }
            state.committed = true;
            decide(&state, &self.settings, now_secs())
        };
        apply(decision, headers, &self.tokens, &self.settings)
    }
}

fn decide(state: &SessionState, settings: &TokenSettings, now: u64) -> Decision {
    if state.invalidated {
        return Decision::Clear;
    }

    let Some(user) = &state.user else {
        return if state.stale_cookie {
            Decision::Clear
        } else {
            Decision::Keep
        };
    };

    match &state.inbound {
        Some(token) if token.user_id == user.uuid => match token.usage {
            // Bearer credentials never turn into a browser session
            TokenUsage::Api => Decision::Keep,
            TokenUsage::Web if token.remaining_at(now) < settings.rotation_threshold_secs() => {
                Decision::Issue(user.clone())
            }
            TokenUsage::Web => Decision::Keep,
        },
        _ => Decision::Issue(user.clone()),
    }
}

fn apply(
    decision: Decision,
    headers: &mut HeaderMap,
    tokens: &TokenRepository,
    settings: &TokenSettings,
) -> Result<(), AuthError> {
    let cookie = match decision {
        Decision::Keep => return Ok(()),
        Decision::Clear => {
            debug!("Clearing session cookie");
            clear_cookie()
        }
        Decision::Issue(user) => {
            let (token, serialized) =
                tokens.issue(&user, TokenUsage::Web, settings.validity(), None)?;
            debug!(user_id = %user.uuid, expiration = token.expiration, "Issued session token");
            session_cookie(&serialized, settings.cookie_max_age_secs())
        }
    };

    headers.append(header::SET_COOKIE, HeaderValue::from_str(&cookie)?);
    Ok(())
}
