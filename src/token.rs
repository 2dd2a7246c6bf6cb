//! Authentication token data model.
//!
//! An [`AuthToken`] is a self-contained credential: it carries the user it was
//! issued for, its expiration and its intended usage. Web tokens are never
//! stored server-side; API tokens are additionally tracked in the owning
//! user's record so they can be revoked.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of random bytes in a generated token id.
const TOKEN_ID_RANDOM_BYTES: usize = 32;

/// What a token may be used for. Carried as a signed claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenUsage {
    /// Ambient browser session, only honored from the session cookie.
    Web,
    /// Explicit bearer credential, only honored from the Authorization header.
    Api,
}

impl TokenUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUsage::Web => "WEB",
            TokenUsage::Api => "API",
        }
    }
}

/// A parsed or freshly minted authentication token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Unique per issuance (`<millis hex>:<random>`)
    pub token_id: String,
    /// UUID of the user the token was issued for
    pub user_id: String,
    /// Expiration (Unix seconds)
    pub expiration: u64,
    pub usage: TokenUsage,
    pub description: Option<String>,
    verified: bool,
}

impl AuthToken {
    /// Mint a new token with a fresh id. Minted tokens are trusted.
    pub fn new(
        user_id: impl Into<String>,
        expiration: u64,
        usage: TokenUsage,
        description: Option<String>,
    ) -> Self {
        Self {
            token_id: generate_token_id(),
            user_id: user_id.into(),
            expiration,
            usage,
            description,
            verified: true,
        }
    }

    /// Rebuild a token from decoded claims.
    pub(crate) fn from_claims(
        token_id: String,
        user_id: String,
        expiration: u64,
        usage: TokenUsage,
        description: Option<String>,
        verified: bool,
    ) -> Self {
        Self {
            token_id,
            user_id,
            expiration,
            usage,
            description,
            verified,
        }
    }

    /// True iff the signature matched the current signing key when parsed.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// A token is expired once `expiration + tolerance` is reached.
    pub fn is_expired_at(&self, tolerance_secs: u64, now: u64) -> bool {
        self.expiration.saturating_add(tolerance_secs) <= now
    }

    /// Seconds left before nominal expiration (zero if already past).
    pub fn remaining_at(&self, now: u64) -> u64 {
        self.expiration.saturating_sub(now)
    }
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn generate_token_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut random = [0u8; TOKEN_ID_RANDOM_BYTES];
    rand::rng().fill_bytes(&mut random);

    format!("{:x}:{}", millis, URL_SAFE_NO_PAD.encode(random))
}
