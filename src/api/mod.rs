mod error;
mod tokens;
mod users;
mod ws;

use axum::{Router, middleware};

use crate::auth::{AuthState, authenticate};

pub use error::ApiError;
pub use users::UsersState;

/// Create the API router.
///
/// Every route except the socket endpoint runs behind the authentication
/// filter; sockets authenticate themselves at upgrade time.
pub fn create_api_router(auth: AuthState, username_login: bool) -> Router {
    let users_state = users::UsersState {
        db: auth.db.clone(),
        username_login,
    };

    let tokens_state = tokens::TokensState { auth: auth.clone() };

    Router::new()
        .merge(users::router(users_state))
        .nest("/tokens", tokens::router(tokens_state))
        .layer(middleware::from_fn_with_state(auth.clone(), authenticate))
        .nest("/ws", ws::router(auth))
}
