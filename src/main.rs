use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use seen_ranking::{
    config::Config,
    db::{self, Cache},
    routes::{create_router, AppState},
    services::providers::TmdbProvider,
    store::PgRankingStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::postgres::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let state = AppState {
        store: Arc::new(PgRankingStore::new(pool)),
        metadata: Arc::new(TmdbProvider::new(
            cache,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
        )),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush whatever the background writer still has queued
    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
