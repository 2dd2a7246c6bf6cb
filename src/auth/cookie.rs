//! Session cookie parsing and construction.

use axum::http::header;

/// Name of the cookie carrying the WEB session token.
pub const TOKEN_COOKIE_NAME: &str = "JWT";

/// Extract a non-empty cookie value, scanning every `Cookie` header in order.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| cookie_from_header(cookies, name))
}

/// Extract a non-empty cookie value from a raw `Cookie` header string.
pub fn cookie_from_header<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a freshly minted session token.
pub fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
        TOKEN_COOKIE_NAME, token, max_age_secs
    )
}

/// `Set-Cookie` value that makes the client drop its session token.
pub fn clear_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0",
        TOKEN_COOKIE_NAME
    )
}
