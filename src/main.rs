use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use staking_ledger::{
    build_router,
    config::Config,
    staking::{InMemoryPositionStore, StakingEngine, SystemClock},
    tracing_logger, AppState,
};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    tracing_logger::init_subscriber(&config.server.log_level);

    let engine = StakingEngine::new(
        config.staking.pool_table(),
        Arc::new(InMemoryPositionStore::new()),
        Arc::new(SystemClock),
        config.staking.engine_settings(),
    )
    .context("failed to build staking engine")?;

    if let Some(path) = &config.staking.pools_file {
        info!(path = %path.display(), overrides = config.staking.pool_overrides.len(), "Pool overrides loaded");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid SERVER_HOST/SERVER_PORT")?;

    let app = build_router(AppState::new(engine, config));

    info!("Staking ledger listening on {}", addr);
    axum::Server::bind(&addr)
        .tcp_nodelay(true)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
