use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use qrshare::config::{Cli, Config};
use qrshare::state::AppState;
use qrshare::{auth, campaigns, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Campaign image folders live under here
    std::fs::create_dir_all(config.campaigns_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    campaigns::upsert_seed(&pool)?;
    let purged = auth::session::purge_expired(&pool)?;
    if purged > 0 {
        tracing::debug!("Purged {} expired admin sessions", purged);
    }
    if config.auth.admin_password_hash.is_none() {
        tracing::warn!("No admin_password_hash configured; uploads and deletes are disabled");
    }

    let state = AppState::new(pool, config.clone());
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
