mod config;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load().context("loading server config")?;
    let catalog = config.load_catalog().context("loading pattern catalog")?;
    tracing::info!(
        "Catalog ready: {} account types, {} patterns",
        catalog.len(),
        catalog.all_patterns().len()
    );

    let state = Arc::new(AppState {
        catalog,
        matching: config.matching,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!("clarify-server listening on {}", config.bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
