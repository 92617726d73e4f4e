//! Stockroom inventory backend - server binary

use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockroom_backend::{
    create_app,
    services::{ActivityService, PgStockStore, StockService},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockroom_server=debug,stockroom_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Stockroom inventory server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        shortfall_policy = ?config.stock.shortfall_policy,
        transaction_timeout_ms = config.stock.transaction_timeout_ms,
        "Stock engine settings"
    );

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Stock service is the single writer of lots, ledger and aggregates
    let stock = StockService::new(
        Arc::new(PgStockStore::new(db_pool.clone())),
        Arc::new(ActivityService::new(db_pool.clone())),
        config.stock.clone(),
    );

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        stock,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
