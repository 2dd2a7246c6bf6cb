//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::TokenSettings;
use crate::db::Database;
use crate::jwt::SigningKey;
use clap::Parser;
use tracing::{error, info};

const MIN_TOKEN_PASSWORD_LENGTH: usize = 16;
const TOKEN_PASSWORD_ENV: &str = "TOKEN_PASSWORD";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Stateless signed-token authentication service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "tokengate.db")]
    pub database: String,

    /// Path to file containing the token signing password. Prefer using TOKEN_PASSWORD env var instead
    #[arg(long)]
    pub token_password_file: Option<String>,

    /// Salt for deriving the token signing key
    #[arg(long, env = "TOKEN_SALT", hide_env_values = true)]
    pub token_salt: Option<String>,

    /// Lifetime of session tokens in minutes
    #[arg(long, default_value = "60", value_parser = validate_expiration_mins)]
    pub token_expiration_mins: u64,

    /// Grace period in seconds during which expired tokens are still honored
    #[arg(long, default_value = "0")]
    pub token_tolerance_secs: u64,

    /// Enable username-only login (development only)
    #[arg(long)]
    pub username_login: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_expiration_mins(s: &str) -> Result<u64, String> {
    let minutes: u64 = s
        .parse()
        .map_err(|_| format!("Not a number of minutes: {}", s))?;

    TokenSettings::new(minutes, 0).map_err(|e| e.to_string())?;
    Ok(minutes)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing password from environment variable or file.
/// Returns None and logs an error if the password cannot be loaded.
pub fn load_token_password(password_file: Option<&str>) -> Option<String> {
    let password = if let Ok(password) = std::env::var(TOKEN_PASSWORD_ENV) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(TOKEN_PASSWORD_ENV) };
        password
    } else if let Some(path) = password_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token password file");
                return None;
            }
        }
    } else {
        error!(
            "Token password is required. Set TOKEN_PASSWORD environment variable (recommended) or use --token-password-file"
        );
        return None;
    };

    if password.len() < MIN_TOKEN_PASSWORD_LENGTH {
        error!(
            "Token password is shorter than {} characters. Use a longer password",
            MIN_TOKEN_PASSWORD_LENGTH
        );
        return None;
    }

    Some(password)
}

/// Derive the signing key. Startup must not continue on failure.
pub fn derive_signing_key(password: &str, salt: Option<&str>) -> Option<SigningKey> {
    let Some(salt) = salt.filter(|s| !s.is_empty()) else {
        error!("Token salt is required. Set TOKEN_SALT environment variable or use --token-salt");
        return None;
    };

    match SigningKey::derive(password, salt) {
        Ok(key) => Some(key),
        Err(e) => {
            error!(error = %e, "Failed to derive token signing key");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    signing_key: SigningKey,
    token_expiration_mins: u64,
    token_tolerance_secs: u64,
    username_login: bool,
) -> Option<ServerConfig> {
    let settings = match TokenSettings::new(token_expiration_mins, token_tolerance_secs) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid token configuration");
            return None;
        }
    };

    Some(ServerConfig {
        db,
        signing_key,
        settings,
        username_login,
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
