//! Rotating session auth server.
//!
//! Serves the session API over HTTP with a PostgreSQL or in-memory session
//! store, a background origin-alert worker and an optional Prometheus exporter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use pico_args::Arguments;
use ra_server::{
    alerts::AuditedNotifier,
    api,
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use rotating_auth::{
    SessionManager,
    db::{Database, MemorySessionRepository, PgSessionRepository, SessionRepository},
    notify::{LogNotifier, NotificationDispatcher, Notifier, WebhookNotifier},
};
use tracing::{error, info, warn};

const HELP: &str = "\
Run the rotating session auth server

USAGE:
  ra_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     postgres or memory          [default: env STORAGE_BACKEND or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  JWT_ACCESS_SECRET        Access token signing secret (required, >= 32 chars)
  JWT_ACCESS_TTL_SECS      Access token lifetime [default: 900]
  JWT_REFRESH_TTL_SECS     Refresh token lifetime [default: 2592000]
  STORE_TIMEOUT_MS         Session store call timeout [default: 5000]
  WEBHOOK_URL              Origin-change webhook (alerts are only logged when unset)
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str("--storage")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.storage)?;
    config.validate()?;
    info!("Starting auth server at {} ({:?} storage)", config.bind, config.storage);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    // Session store
    let (repo, database): (Arc<dyn SessionRepository>, Option<Database>) = match config.storage {
        StorageBackend::Postgres => {
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.ensure_schema()
                .await
                .context("Failed to create sessions schema")?;
            info!("Database connected successfully");
            let repo: Arc<dyn SessionRepository> =
                Arc::new(PgSessionRepository::new(db.pool().clone()));
            (repo, Some(db))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory session storage; sessions are lost on restart");
            let repo: Arc<dyn SessionRepository> = Arc::new(MemorySessionRepository::new());
            (repo, None)
        }
    };

    // Origin-change alerts
    let notifier: Arc<dyn Notifier> = match config.notifications.webhook() {
        Some(webhook) => {
            info!("Origin-change alerts go to {}", webhook.url);
            Arc::new(WebhookNotifier::new(webhook)?)
        }
        None => Arc::new(LogNotifier),
    };
    let (alerts, alert_worker) = NotificationDispatcher::spawn(
        Arc::new(AuditedNotifier::new(notifier)),
        config.notifications.queue_capacity,
    );

    let sessions = Arc::new(SessionManager::new(repo, &config.auth_config(), alerts));

    let purge_task = (config.purge_interval_secs > 0).then(|| {
        tokio::spawn(purge_expired_sessions(
            sessions.clone(),
            Duration::from_secs(config.purge_interval_secs),
        ))
    });

    let app = api::create_router(api::AppState::new(sessions.clone(), database.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down server...");

    if let Some(task) = purge_task {
        task.abort();
    }

    // Dropping the last handle lets the worker drain queued alerts and exit
    drop(sessions);
    if tokio::time::timeout(Duration::from_secs(5), alert_worker)
        .await
        .is_err()
    {
        warn!("Notification worker did not drain within 5s");
    }

    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Periodically delete expired sessions
async fn purge_expired_sessions(sessions: Arc<SessionManager>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match sessions.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => {
                metrics::sessions_purged(purged);
                info!("Purged {} expired session(s)", purged);
            }
            Err(e) => error!("Failed to purge expired sessions: {}", e),
        }
    }
}

/// Graceful shutdown signal (Ctrl+C, or SIGTERM on unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
