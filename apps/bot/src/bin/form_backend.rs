//! Standalone registration form backend
//!
//! Stores submissions and confirms them over Telegram. The searches are
//! picked up by the bot process once the job turns active.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use appointment_bot::api::{self, AppState};
use appointment_bot::config::{Config, BACKEND_PORT};
use appointment_bot::infrastructure::database;
use appointment_bot::infrastructure::error_reporter::ErrorReporter;
use appointment_bot::infrastructure::repositories::{
    PostgresJobRepository, PostgresSubmissionRepository, PostgresUserRepository,
};
use appointment_bot::infrastructure::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    appointment_bot::init_tracing();

    let config = Config::from_env(BACKEND_PORT)?;

    tracing::info!("Connecting to database...");
    let pool = database::connect(&config.database_url, config.db_max_connections).await?;
    database::init_schema(&pool).await?;

    let state = AppState {
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        jobs: Arc::new(PostgresJobRepository::new(pool.clone())),
        submissions: Arc::new(PostgresSubmissionRepository::new(pool)),
        messenger: Arc::new(TelegramClient::new(
            &config.telegram_api_url,
            &config.telegram_token,
        )?),
        searches: None,
        reporter: ErrorReporter::new(
            &config.telegram_api_url,
            config.error_bot_token.as_deref(),
            config.error_chat_id.as_deref(),
        ),
        save_timeout: Duration::from_secs(60),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Form backend listening on {}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;
    Ok(())
}
