//! Server entry-point: loads settings, prepares the store and serves the API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pointminer::inbound::http::health::HealthState;
use pointminer::outbound::memory::InMemoryStore;
use pointminer::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use pointminer::settings::ServerSettings;

use server::{ServerConfig, Store, create_server};

async fn open_store(settings: &ServerSettings) -> Result<Store> {
    let Some(url) = settings.database_url() else {
        warn!("no database url configured; using the in-memory store");
        return Ok(Store::Memory(Arc::new(InMemoryStore::with_default_catalog())));
    };

    run_migrations(url)
        .await
        .wrap_err("failed to apply database migrations")?;
    let mut pool_config = PoolConfig::new(url);
    if let Some(max_size) = settings.db_max_connections {
        pool_config = pool_config.with_max_size(max_size);
    }
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;
    info!("using the PostgreSQL store");
    Ok(Store::Postgres(pool))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().wrap_err("failed to load settings")?;
    settings.validate().wrap_err("invalid settings")?;

    let health_state = web::Data::new(HealthState::new());
    let store = open_store(&settings).await?;
    let server = create_server(
        health_state.clone(),
        ServerConfig::from_settings(&settings, store),
    )
    .wrap_err("failed to start http server")?;

    actix_web::rt::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            health_state.mark_unhealthy();
            info!("shutdown requested; liveness probe now failing");
        }
    });

    server.await.wrap_err("http server terminated abnormally")
}
