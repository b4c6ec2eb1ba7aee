use anyhow::Context;
use tracing::info;

use member_directory::config::AppConfig;
use member_directory::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up MOD_LINK_SECRET, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    server::init_tracing();

    let config = AppConfig::from_env();
    info!(
        "Starting Member Directory API in {:?} mode with {:?} store",
        config.environment, config.storage.backend
    );

    let state = server::build_state(&config).await?;
    let app = server::app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Member Directory API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
