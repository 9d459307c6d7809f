//! Farm Management Platform - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farm_backend::config::{Config, StorageBackend};
use farm_backend::store::{
    HarvestLedger, MemoryHarvestLedger, MemoryPlanStore, PgHarvestLedger, PgPlanStore, PlanStore,
};
use farm_backend::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    config.validate()?;

    // Initialize tracing
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farm_server=debug,farm_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting Farm Management Server");
    tracing::info!("Environment: {}", config.environment);

    let (plans, ledger): (Arc<dyn PlanStore>, Arc<dyn HarvestLedger>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                // Create database connection pool
                tracing::info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .min_connections(config.database.min_connections)
                    .acquire_timeout(Duration::from_secs(30))
                    .connect(&config.database.url)
                    .await?;

                tracing::info!("Database connection established");

                // Run migrations in development
                if config.environment == "development" {
                    tracing::info!("Running database migrations...");
                    sqlx::migrate!("./migrations").run(&db_pool).await?;
                    tracing::info!("Migrations completed");
                }

                let plans: Arc<dyn PlanStore> = Arc::new(PgPlanStore::new(db_pool.clone()));
                let ledger: Arc<dyn HarvestLedger> = Arc::new(PgHarvestLedger::new(db_pool));
                (plans, ledger)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let plans: Arc<dyn PlanStore> = Arc::new(MemoryPlanStore::new());
                let ledger: Arc<dyn HarvestLedger> = Arc::new(MemoryHarvestLedger::new());
                (plans, ledger)
            }
        };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create application state
    let state = AppState::new(config, plans, ledger);

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
