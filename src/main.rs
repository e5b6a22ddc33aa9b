//! dnslens server entry point.
//!
//! Runs migrations, seeds first-boot settings and sources from the
//! environment, starts the ingestion scheduler, and serves the REST API.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dnslens::api;
use dnslens::app_state::AppState;
use dnslens::config::AppConfig;
use dnslens::ingest::pipeline::{SETTING_API_KEY, SETTING_FETCH_INTERVAL, SETTING_FETCH_LIMIT};
use dnslens::ingest::{IngestionPipeline, Scheduler, UpstreamClient};
use dnslens::persistence::{LogStore, PgStore};
use dnslens::service::StatsService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting dnslens");

    // Connect and migrate
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    seed_first_boot(&store, &config).await?;

    // Build ingestion and aggregation layers
    let upstream = Arc::new(UpstreamClient::new(&config.upstream_base_url)?);
    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&store) as Arc<dyn LogStore>,
        upstream,
    ));
    let stats = Arc::new(StatsService::new(Arc::clone(&store) as Arc<dyn LogStore>));

    // Background scheduler
    let scheduler = Scheduler::new(
        Arc::clone(&pipeline),
        Arc::clone(&store) as Arc<dyn LogStore>,
        config.fetch_interval_minutes,
    );
    tokio::spawn(scheduler.run());

    // Build application state and router
    let app_state = AppState {
        store,
        stats,
        pipeline,
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seeds the settings and sources tables from the environment on first
/// boot only; after that the tables are the source of truth and the
/// admin endpoints manage them.
async fn seed_first_boot(
    store: &PgStore,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if !store.settings_empty().await? {
        return Ok(());
    }
    if let Some(api_key) = &config.api_key {
        store.set_setting(SETTING_API_KEY, api_key).await?;
    }
    store
        .set_setting(SETTING_FETCH_LIMIT, &config.fetch_limit.to_string())
        .await?;
    store
        .set_setting(
            SETTING_FETCH_INTERVAL,
            &config.fetch_interval_minutes.to_string(),
        )
        .await?;
    for source_id in &config.source_ids {
        store.upsert_source(source_id, None, true).await?;
    }
    tracing::info!("seeded runtime settings and sources from environment");
    Ok(())
}
