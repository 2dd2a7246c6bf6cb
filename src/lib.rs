pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod token;

use api::create_api_router;
use auth::{AuthState, TokenSettings};
use axum::Router;
use db::Database;
use jwt::SigningKey;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Key signing every token, derived once at startup
    pub signing_key: SigningKey,
    /// Session token lifetime and expiry tolerance
    pub settings: TokenSettings,
    /// Whether the username-only login route is enabled
    pub username_login: bool,
}

impl ServerConfig {
    pub fn auth_state(&self) -> AuthState {
        AuthState::new(self.db.clone(), &self.signing_key, self.settings)
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    build_router(config.auth_state(), config.username_login)
}

fn build_router(auth: AuthState, username_login: bool) -> Router {
    Router::new().nest("/api", create_api_router(auth, username_login))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(auth: &AuthState) {
    cleanup::run_cleanup(&auth.tokens).await;
    cleanup::spawn_cleanup_scheduler(auth.tokens.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let auth = config.auth_state();
    init_cleanup(&auth).await;

    let app = build_router(auth, config.username_login);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
