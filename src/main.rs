use clap::Parser;
use tokengate::cli::{
    Args, build_config, derive_signing_key, init_logging, load_token_password, open_database,
};
use tokengate::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(password) = load_token_password(args.token_password_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(signing_key) = derive_signing_key(&password, args.token_salt.as_deref()) else {
        std::process::exit(1);
    };
    drop(password);

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let Some(config) = build_config(
        db,
        signing_key,
        args.token_expiration_mins,
        args.token_tolerance_secs,
        args.username_login,
    ) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
