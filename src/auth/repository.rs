//! Token issuance, validation and API token revocation lists.
//!
//! WEB tokens are judged from their signed payload alone. API tokens must
//! additionally be present in the owning user's persisted token map, which
//! is read fresh on every check so deleting an entry revokes the token
//! immediately.

use std::time::Duration;

use tracing::{error, info};

use super::errors::AuthError;
use crate::db::{Database, User};
use crate::jwt::{JwtError, TokenCodec};
use crate::token::{AuthToken, TokenUsage, now_secs};

/// User property holding API tokens, keyed by description.
pub const API_TOKEN_PROPERTY: &str = "apiToken";

/// Outcome of validating a parsed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    /// The MAC does not match the current key
    SignatureInvalid,
    /// Past expiration plus tolerance
    Expired,
    /// API token missing from the user's token map
    Revoked,
}

pub struct TokenRepository {
    codec: TokenCodec,
    db: Database,
    tolerance_secs: u64,
}

impl TokenRepository {
    pub fn new(codec: TokenCodec, db: Database, tolerance_secs: u64) -> Self {
        Self {
            codec,
            db,
            tolerance_secs,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn parse(&self, token: &str) -> Result<AuthToken, JwtError> {
        self.codec.parse(token)
    }

    pub fn serialize(&self, token: &AuthToken) -> Result<String, AuthError> {
        Ok(self.codec.serialize(token)?)
    }

    /// Mint and serialize a new token for `user` expiring `ttl` from now.
    pub fn issue(
        &self,
        user: &User,
        usage: TokenUsage,
        ttl: Duration,
        description: Option<String>,
    ) -> Result<(AuthToken, String), AuthError> {
        let expiration = now_secs().saturating_add(ttl.as_secs());
        let token = AuthToken::new(user.uuid.clone(), expiration, usage, description);
        let serialized = self.serialize(&token)?;
        Ok((token, serialized))
    }

    /// Validate a token, resolving its owner from the user directory.
    /// Tokens for unknown users are invalid.
    pub async fn is_valid(&self, token: &AuthToken) -> Result<bool, AuthError> {
        match self.db.users().get_by_uuid(&token.user_id).await? {
            Some(user) => self.is_valid_for(&user, token).await,
            None => Ok(false),
        }
    }

    /// Validate a token on behalf of an already resolved user.
    pub async fn is_valid_for(&self, user: &User, token: &AuthToken) -> Result<bool, AuthError> {
        Ok(self.check(user, token).await? == TokenStatus::Valid)
    }

    pub async fn check(&self, user: &User, token: &AuthToken) -> Result<TokenStatus, AuthError> {
        self.check_at(user, token, now_secs()).await
    }

    /// Validate against an explicit clock.
    pub async fn check_at(
        &self,
        user: &User,
        token: &AuthToken,
        now: u64,
    ) -> Result<TokenStatus, AuthError> {
        if !token.is_verified() {
            return Ok(TokenStatus::SignatureInvalid);
        }
        if token.is_expired_at(self.tolerance_secs, now) {
            return Ok(TokenStatus::Expired);
        }
        if token.usage == TokenUsage::Api {
            let listed = self
                .load_valid_api_tokens(user)
                .await?
                .iter()
                .any(|t| t.token_id == token.token_id);
            if !listed {
                return Ok(TokenStatus::Revoked);
            }
        }
        Ok(TokenStatus::Valid)
    }

    /// Persist an API token in the user's token map, keyed by its
    /// description or a generated key.
    pub async fn save_api_token(&self, user: &User, token: &AuthToken) -> Result<(), AuthError> {
        let key = token
            .description
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let serialized = self.serialize(token)?;
        self.db
            .properties()
            .set(user.id, API_TOKEN_PROPERTY, &key, &serialized)
            .await?;
        Ok(())
    }

    /// Remove the API token with the given id. Returns whether one was removed;
    /// an unknown id is not an error.
    pub async fn delete_api_token(&self, user: &User, token_id: &str) -> Result<bool, AuthError> {
        let mut removed = false;
        for (key, token) in self.load_keyed_api_tokens(user).await? {
            if token.token_id == token_id {
                removed |= self
                    .db
                    .properties()
                    .remove(user.id, API_TOKEN_PROPERTY, &key)
                    .await?;
            }
        }
        if removed {
            info!(user_id = %user.uuid, token_id = %token_id, "API token revoked");
        }
        Ok(removed)
    }

    /// Parse every API token persisted for the user.
    pub async fn load_valid_api_tokens(&self, user: &User) -> Result<Vec<AuthToken>, AuthError> {
        Ok(self
            .load_keyed_api_tokens(user)
            .await?
            .into_iter()
            .map(|(_, token)| token)
            .collect())
    }

    async fn load_keyed_api_tokens(
        &self,
        user: &User,
    ) -> Result<Vec<(String, AuthToken)>, AuthError> {
        let entries = self.db.properties().list(user.id, API_TOKEN_PROPERTY).await?;
        entries
            .into_iter()
            .map(|(key, value)| match self.codec.parse(&value) {
                Ok(token) => Ok((key, token)),
                Err(e) => {
                    error!(user_id = %user.uuid, key = %key, error = %e, "Unable to parse stored API token");
                    Err(AuthError::CorruptStoredToken {
                        user_id: user.uuid.clone(),
                        key,
                    })
                }
            })
            .collect()
    }

    /// Remove API tokens that expired beyond tolerance from every user's
    /// token map. Unparseable entries are reported and left in place.
    pub async fn purge_expired_api_tokens(&self) -> Result<u64, AuthError> {
        let now = now_secs();
        let properties = self.db.properties();
        let mut purged = 0;

        for entry in properties.list_all(API_TOKEN_PROPERTY).await? {
            match self.codec.parse(&entry.value) {
                Ok(token) if token.is_expired_at(self.tolerance_secs, now) => {
                    if properties
                        .remove(entry.user_id, API_TOKEN_PROPERTY, &entry.key)
                        .await?
                    {
                        purged += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(user_id = entry.user_id, key = %entry.key, error = %e, "Unable to parse stored API token");
                }
            }
        }

        Ok(purged)
    }
}
