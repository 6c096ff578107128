use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use appointment_bot::api::{self, AppState};
use appointment_bot::appointments::{BrowserAppointmentChecker, CheckerSettings};
use appointment_bot::bot::{poller, Bot, BotDeps};
use appointment_bot::config::{Config, BOT_PORT};
use appointment_bot::infrastructure::browser::WebDriverBrowser;
use appointment_bot::infrastructure::database;
use appointment_bot::infrastructure::error_reporter::ErrorReporter;
use appointment_bot::infrastructure::repositories::{
    PostgresJobRepository, PostgresSubmissionRepository, PostgresUserRepository,
};
use appointment_bot::infrastructure::telegram::TelegramClient;
use appointment_bot::scheduler::JobScheduler;
use appointment_bot::searches::{SearchDeps, SearchService, SearchSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    appointment_bot::init_tracing();

    let config = Config::from_env(BOT_PORT)?;

    tracing::info!("Connecting to database...");
    let pool = database::connect(&config.database_url, config.db_max_connections).await?;
    database::init_schema(&pool).await?;
    tracing::info!("Database connected successfully");

    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let jobs = Arc::new(PostgresJobRepository::new(pool.clone()));
    let submissions = Arc::new(PostgresSubmissionRepository::new(pool.clone()));

    let telegram = TelegramClient::new(&config.telegram_api_url, &config.telegram_token)?;
    let messenger = Arc::new(telegram.clone());
    let reporter = ErrorReporter::new(
        &config.telegram_api_url,
        config.error_bot_token.as_deref(),
        config.error_chat_id.as_deref(),
    );

    let browser = Arc::new(WebDriverBrowser::new(
        &config.webdriver_url,
        config.chrome_binary.clone(),
    )?);
    let checker = Arc::new(BrowserAppointmentChecker::new(
        browser,
        config.proxy_file.clone(),
        CheckerSettings::default(),
    ));

    let scheduler = JobScheduler::new();
    let searches = SearchService::new(
        SearchDeps {
            jobs: jobs.clone(),
            submissions: submissions.clone(),
            messenger: messenger.clone(),
            checker: checker.clone(),
            reporter: reporter.clone(),
        },
        SearchSettings::new(config.forms_url.clone(), config.check_interval),
        scheduler.clone(),
    );

    match searches.restore_active().await {
        Ok(count) => tracing::info!(count, "Restored active searches"),
        Err(e) => tracing::error!(error = %e, "Error restarting active jobs"),
    }
    searches.start_sweeper();

    let bot = Arc::new(Bot::new(BotDeps {
        users: users.clone(),
        jobs: jobs.clone(),
        submissions: submissions.clone(),
        messenger: messenger.clone(),
        checker,
        searches: searches.clone(),
        reporter: reporter.clone(),
        forms_url: config.forms_url.clone(),
    }));

    let state = AppState {
        users,
        jobs,
        submissions,
        messenger,
        searches: Some(searches),
        reporter,
        save_timeout: Duration::from_secs(60),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    let server = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    let polling = poller::run_polling(telegram, bot, wait_for_shutdown(shutdown_rx));

    let (served, ()) = tokio::join!(server, polling);

    tracing::info!("Stopping scheduled searches");
    scheduler.shutdown();
    served?;
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
