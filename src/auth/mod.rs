//! Stateless signed-token authentication.
//!
//! WEB tokens travel in the `JWT` session cookie and are never stored server
//! side; they are re-minted by the response side of the filter once less than
//! half their validity remains. API tokens travel in the `Authorization`
//! header and must also be listed in the owner's persisted token map, which
//! makes them revocable.

mod channel;
mod cookie;
mod errors;
mod extractors;
mod filter;
mod repository;
mod session;
mod state;
mod types;
mod websocket;

pub use channel::{BEARER_SCHEME, Channel, accepts, bearer_token};
pub use cookie::{TOKEN_COOKIE_NAME, clear_cookie, cookie_from_header, get_cookie, session_cookie};
pub use errors::{ApiAuthError, AuthError, AuthErrorKind};
pub use extractors::{Auth, OptionalAuth, Session};
pub use filter::authenticate;
pub use repository::{API_TOKEN_PROPERTY, TokenRepository, TokenStatus};
pub use session::{AuthSession, Decision};
pub use state::{
    AuthState, COOKIE_SAFETY_MARGIN_SECS, ConfigError, MIN_TOKEN_VALIDITY_MINUTES, TokenSettings,
};
pub use types::CurrentUser;
pub use websocket::{WsRejection, inspect};
