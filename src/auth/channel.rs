//! Transport channel rules.
//!
//! WEB tokens are only honored from the session cookie and API tokens only
//! from the `Authorization` header, so a credential can never be replayed
//! through the other channel.

use axum::http::{HeaderMap, header};

use crate::token::TokenUsage;

/// Authorization scheme for API tokens (matched case-insensitively).
pub const BEARER_SCHEME: &str = "Bearer";

/// Where a candidate token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Cookie,
    Header,
}

/// Whether a token of the given usage may establish identity on a channel.
pub fn accepts(usage: TokenUsage, channel: Channel) -> bool {
    matches!(
        (usage, channel),
        (TokenUsage::Web, Channel::Cookie) | (TokenUsage::Api, Channel::Header)
    )
}

/// Extract the bearer token from the first `Authorization` header using the
/// bearer scheme. Anything after the first comma is discarded.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::AUTHORIZATION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(strip_bearer)
}

fn strip_bearer(value: &str) -> Option<&str> {
    let scheme = value.get(..BEARER_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = value[BEARER_SCHEME.len()..].trim();
    let token = token.split(',').next().unwrap_or_default().trim();
    (!token.is_empty()).then_some(token)
}
