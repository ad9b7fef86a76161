use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use campus_auth::{
    AppState,
    clock::{Clock, SystemClock},
    config::Settings,
    database,
    mailer::{self, LogMailer, Mailer, SmtpMailer},
    routes,
    sweeper::SessionSweeper,
};
use common::database::DatabaseConfig;

/// Upper bound for migrations and the first health check.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for queued mail.
const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting authentication service");

    let settings = Settings::from_env()?;
    let db_config = DatabaseConfig::from_env()?;

    let pool = tokio::time::timeout(STARTUP_TIMEOUT, database::prepare(&db_config))
        .await
        .context("Database startup timed out")??;
    info!("Database connection successful");

    let mailer: Arc<dyn Mailer> = match settings.smtp() {
        Some(smtp) => {
            info!("Delivering mail via {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(&smtp)?)
        }
        None => {
            warn!("SMTP_HOST not set, mail will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (outbox, mail_rx) = mailer::outbox();
    let mail_worker = tokio::spawn(mailer::run_mail_worker(mail_rx, mailer));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = AppState::new(pool, &settings, clock.clone(), outbox)?;

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(
        SessionSweeper::new(app_state.sessions.clone(), clock).run(cancel.child_token()),
    );

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let addr = format!("0.0.0.0:{}", settings.http_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Authentication service listening on {}", addr);

    // The router owns the last outbox handle, so the mail worker sees the
    // queue close once the server has shut down.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, shutting down background tasks");
    cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!("Session sweeper task failed: {}", e);
    }

    match tokio::time::timeout(MAIL_DRAIN_TIMEOUT, mail_worker).await {
        Ok(Ok(())) => info!("Mail queue drained"),
        Ok(Err(e)) => warn!("Mail worker task failed: {}", e),
        Err(_) => warn!("Timed out draining the mail queue"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
