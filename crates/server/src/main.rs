use std::path::PathBuf;

use anyhow::Context;

use taskdeck_api::crypto;
use taskdeck_runtime_config::{CONFIG_FILE_NAME, CONFIG_PATH_ENV, ServerConfig};
use taskdeck_server::{AppConfig, AppState, build_router, storage, sweep};

fn load_config() -> anyhow::Result<ServerConfig> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut config = ServerConfig::load_or_default(&path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    tracing::info!("configuration loaded (file: {})", path.display());
    Ok(config)
}

async fn shutdown_signal(tx: tokio::sync::watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutting down");
    let _ = tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck_server=info,tower_http=info".into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!("data directory: {}", config.server.data_dir.display());

    let db = storage::init_db(&config.server.data_dir)?;
    tracing::info!("database initialized");

    let jwt_secret = if config.auth.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set; using a random secret, sessions end on restart");
        crypto::generate_token().context("generating JWT secret")?
    } else {
        config.auth.jwt_secret.clone()
    };

    let state = AppState {
        db: db.clone(),
        config: AppConfig::from_server_config(&config, jwt_secret),
    };
    let app = build_router(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweep_handle = tokio::spawn(sweep::run_attendance_sweep(
        db,
        config.attendance.sweep_interval_secs,
        shutdown_rx,
    ));

    tracing::info!("starting server at {}", config.server.base_url);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .with_context(|| format!("binding port {}", config.server.port))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    let _ = sweep_handle.await;
    Ok(())
}
