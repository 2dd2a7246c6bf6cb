//! Authentication context types.

use crate::db::User;
use crate::token::AuthToken;

/// Identity attached to a request (or socket) once its token was accepted.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// The inbound token that established the identity
    pub token: AuthToken,
}
