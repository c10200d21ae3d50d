mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lightbox_api::auth::AuthService;
use lightbox_api::files::DiskFileStore;
use lightbox_api::session::{FileSessionStore, SessionSettings};
use lightbox_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lightbox=debug,lightbox_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);

    let files = Arc::new(DiskFileStore::new(config.user_data_dir.clone())?);
    let sessions = FileSessionStore::open(config.session_dir.clone())?;
    let settings = SessionSettings::new(config.secret_key.as_bytes(), config.session_ttl, false)?;
    let auth = Arc::new(AuthService::new(db, files.clone()));

    tokio::spawn(sweep_expired_sessions(sessions.clone()));

    let app = lightbox_api::build_app(auth, files, sessions, &settings)?
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Lightbox listening on {}", addr);
    info!("Sessions expire after {} hours", config.session_ttl.num_hours());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Hourly cleanup of session files nobody came back for.
async fn sweep_expired_sessions(store: FileSessionStore) {
    let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
    loop {
        interval.tick().await;
        if let Err(e) = store.delete_expired().await {
            warn!("Expired session sweep failed: {}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
