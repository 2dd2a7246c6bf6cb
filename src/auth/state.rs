//! Authentication state shared by the request filter, the response
//! interceptor and the socket interceptor.

use std::sync::Arc;
use std::time::Duration;

use super::repository::TokenRepository;
use crate::db::Database;
use crate::jwt::{SigningKey, TokenCodec};

/// Shortest accepted session token validity.
pub const MIN_TOKEN_VALIDITY_MINUTES: u64 = 1;

/// Subtracted from the cookie lifetime so browsers never send an expired token.
pub const COOKIE_SAFETY_MARGIN_SECS: u64 = 60;

/// Token lifetime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    validity_secs: u64,
    tolerance_secs: u64,
}

impl TokenSettings {
    pub fn new(validity_minutes: u64, tolerance_secs: u64) -> Result<Self, ConfigError> {
        if validity_minutes < MIN_TOKEN_VALIDITY_MINUTES {
            return Err(ConfigError::ValidityTooShort(validity_minutes));
        }
        let validity_secs = validity_minutes
            .checked_mul(60)
            .ok_or(ConfigError::ValidityTooLong(validity_minutes))?;
        Ok(Self {
            validity_secs,
            tolerance_secs,
        })
    }

    /// Lifetime of a minted session token.
    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_secs())
    }

    pub fn validity_secs(&self) -> u64 {
        self.validity_secs
    }

    /// Grace period past nominal expiration.
    pub fn tolerance_secs(&self) -> u64 {
        self.tolerance_secs
    }

    /// Session tokens with less remaining lifetime than this are re-minted.
    pub fn rotation_threshold_secs(&self) -> u64 {
        self.validity_secs() / 2
    }

    /// `Max-Age` of an issued session cookie. Never zero, which would delete it.
    pub fn cookie_max_age_secs(&self) -> u64 {
        self.validity_secs()
            .saturating_sub(COOKIE_SAFETY_MARGIN_SECS)
            .max(1)
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            validity_secs: 60 * 60,
            tolerance_secs: 0,
        }
    }
}

/// Invalid token configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("token expiration must be at least {MIN_TOKEN_VALIDITY_MINUTES} minute(s), got {0}")]
    ValidityTooShort(u64),
    #[error("token expiration of {0} minutes is too large")]
    ValidityTooLong(u64),
}

/// Everything the authentication layer needs, constructed once at startup.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub tokens: Arc<TokenRepository>,
    pub settings: TokenSettings,
}

impl AuthState {
    pub fn new(db: Database, key: &SigningKey, settings: TokenSettings) -> Self {
        let tokens = TokenRepository::new(TokenCodec::new(key), db.clone(), settings.tolerance_secs());
        Self {
            db,
            tokens: Arc::new(tokens),
            settings,
        }
    }
}
