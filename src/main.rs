#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use order_ledger::{
    config::{self, database},
    core::{OrderEngine, restaurant},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load engine, billing and seed configuration
    let config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading configuration: {}", e))?;
    info!(
        "Configuration loaded: {:?} bill numbers, {:?} removal policy",
        config.billing.numbering, config.engine.removal_payment_policy
    );

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed restaurants and their tables
    let seeded = restaurant::seed_restaurants(&db, &config.restaurants)
        .await
        .inspect_err(|e| error!("Failed to seed restaurants: {}", e))?;

    // 6. Report what is running
    let engine = OrderEngine::new(db, &config);
    for r in &seeded {
        let open = engine.list_open_orders(r.id).await?;
        info!(
            "Restaurant {} '{}' ready (GST {}%, service {}%, {} open orders)",
            r.id,
            r.name,
            r.gst_rate_percent,
            r.service_rate_percent,
            open.len()
        );
    }

    Ok(())
}
