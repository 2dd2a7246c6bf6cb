//! Scheduled cleanup of expired API tokens.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::auth::TokenRepository;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(tokens: &TokenRepository) {
    match tokens.purge_expired_api_tokens().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired API tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired API tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(tokens: Arc<TokenRepository>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&tokens).await;
        }
    })
}
