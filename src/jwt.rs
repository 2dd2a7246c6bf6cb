//! Signing key derivation and JWT encoding of auth tokens.
//!
//! Tokens are HS256 JWTs carrying `{jti, sub, exp, aud, description?}`.
//! Parsing is split in two steps: the structure is decoded first (a failure
//! there means "no credential"), then the MAC is checked. A token with a bad
//! MAC is still returned, with `verified == false`, so callers can tell a
//! tampered credential apart from a missing one.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::token::{AuthToken, TokenUsage};

/// PBKDF2 rounds used to stretch the signing password.
pub const KEY_DERIVATION_ROUNDS: u32 = 10_000;

/// Derived key length in bytes (256 bits).
const KEY_LENGTH: usize = 32;

/// Symmetric signing key, derived once at startup and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    bytes: [u8; KEY_LENGTH],
}

impl SigningKey {
    /// Derive a signing key from a password and salt with PBKDF2-HMAC-SHA256.
    /// Identical inputs always yield an identical key.
    pub fn derive(password: &str, salt: &str) -> Result<Self, JwtError> {
        if password.is_empty() {
            return Err(JwtError::KeyDerivation("password is empty"));
        }
        if salt.is_empty() {
            return Err(JwtError::KeyDerivation("salt is empty"));
        }

        let mut bytes = [0u8; KEY_LENGTH];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            salt.as_bytes(),
            KEY_DERIVATION_ROUNDS,
            &mut bytes,
        );
        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// JWT claims as they appear on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    /// Token id
    jti: String,
    /// User UUID
    sub: String,
    /// Expiration (Unix seconds)
    exp: u64,
    /// Usage; absent means WEB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// JWT `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn usage(&self) -> TokenUsage {
        let api = TokenUsage::Api.as_str();
        let is_api = match self {
            Audience::One(aud) => aud == api,
            Audience::Many(auds) => auds.iter().any(|aud| aud == api),
        };
        if is_api {
            TokenUsage::Api
        } else {
            TokenUsage::Web
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    #[allow(dead_code)]
    alg: String,
}

/// Signs and verifies tokens with a single [`SigningKey`].
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(key: &SigningKey) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&key.bytes),
            decoding_key: DecodingKey::from_secret(&key.bytes),
        }
    }

    /// Encode and sign a token.
    pub fn serialize(&self, token: &AuthToken) -> Result<String, JwtError> {
        let claims = TokenClaims {
            jti: token.token_id.clone(),
            sub: token.user_id.clone(),
            exp: token.expiration,
            aud: Some(Audience::One(token.usage.as_str().to_string())),
            description: token.description.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Serialization)
    }

    /// Decode a token. Fails only if the token is structurally malformed;
    /// a signature mismatch yields a token with `verified == false`.
    pub fn parse(&self, token: &str) -> Result<AuthToken, JwtError> {
        let claims = decode_claims(token)?;
        let verified = self.verify(token);
        let usage = claims
            .aud
            .as_ref()
            .map(Audience::usage)
            .unwrap_or(TokenUsage::Web);

        Ok(AuthToken::from_claims(
            claims.jti,
            claims.sub,
            claims.exp,
            usage,
            claims.description,
            verified,
        ))
    }

    /// Check the MAC only. Expiry and audience are judged by the repository.
    fn verify(&self, token: &str) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation).is_ok()
    }
}

fn decode_claims(token: &str) -> Result<TokenClaims, JwtError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JwtError::Parse("expected three segments".into()));
    };

    let _: RawHeader = decode_segment(header)?;
    decode_segment(payload)
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, JwtError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| JwtError::Parse(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| JwtError::Parse(e.to_string()))
}

/// Errors that can occur during key derivation or token encoding.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The signing key could not be derived; fatal at startup
    #[error("Failed to derive signing key: {0}")]
    KeyDerivation(&'static str),
    /// Error encoding or signing the token
    #[error("Failed to serialize token: {0}")]
    Serialization(#[source] jsonwebtoken::errors::Error),
    /// The token is not a well-formed JWT
    #[error("Malformed token: {0}")]
    Parse(String),
}
