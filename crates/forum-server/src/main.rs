//! Forum server entry point.
//!
//! Opens the database and media directory, then starts the Axum HTTP server
//! with graceful shutdown. A background session sweeper runs alongside the
//! server and is stopped on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use forum_core::db;
use forum_core::session::SessionStore;
use forum_storage::DiskBackend;

use forum_server::build_router;
use forum_server::config::ServerConfig;
use forum_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(database = %config.database_url, media_dir = %config.media_dir.display(), "forum starting");

    let state = Arc::new(build_app_state(&config).await?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_handle = {
        let sessions = Arc::clone(&state.sessions);
        let mut rx = shutdown_rx.clone();
        let interval_secs = config.session_sweep_interval_secs;
        tokio::spawn(async move {
            session_sweeper(sessions, &mut rx, interval_secs).await;
        })
    };

    let app = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "forum server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    info!("waiting for background workers to stop");
    let _ = tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await;

    info!("forum server stopped");
    Ok(())
}

/// Open the database and media directory and assemble the shared state.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    db::init_schema(&pool)
        .await
        .context("failed to initialize database schema")?;

    let media = DiskBackend::open(&config.media_dir).context("failed to open media directory")?;

    let state = AppState::new(config, pool, Arc::new(media))
        .context("failed to compile page templates")?;

    match config.session_ttl() {
        Some(ttl) => info!(ttl_secs = ttl.num_seconds(), "sessions expire"),
        None => info!("sessions never expire"),
    }
    Ok(state)
}

/// Periodically drop expired sessions until shutdown.
async fn session_sweeper(
    sessions: Arc<SessionStore>,
    shutdown: &mut watch::Receiver<bool>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    info!(interval_secs, "session sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = sessions.purge_expired().await;
                if purged > 0 {
                    info!(purged, "expired sessions purged");
                } else {
                    debug!("session sweep found nothing to purge");
                }
            }
            _ = shutdown.changed() => {
                info!("session sweeper shutting down");
                return;
            }
        }
    }
}

/// Wait for SIGINT/SIGTERM, then tell background workers to stop.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
