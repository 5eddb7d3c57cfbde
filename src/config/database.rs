//! Database configuration module for the order ledger.
//!
//! This module handles the store connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`, so the
//! schema always matches the Rust structs. The one constraint entities cannot express, a
//! partial unique index allowing a single open dine-in order per table, is added as raw SQL.

use crate::entities::{
    DiningTable, ItemVariant, MenuItem, Modifier, Order, OrderItem, Restaurant, SystemState,
    Transaction,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/order_ledger.sqlite?mode=rwc";

/// Partial unique index backing "one running bill per table".
const ONE_OPEN_ORDER_PER_TABLE: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
    idx_orders_one_open_dine_in_per_table ON orders (restaurant_id, table_id) \
    WHERE NOT closed AND status <> 'CANCELLED' AND order_type = 'DINE_IN' \
    AND table_id IS NOT NULL";

const ORDER_ITEMS_BY_ORDER: &str =
    "CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items (order_id)";

/// Gets the database URL from environment variable or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the store named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents first so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Restaurant).await?;
    create_table(db, &schema, DiningTable).await?;
    create_table(db, &schema, MenuItem).await?;
    create_table(db, &schema, ItemVariant).await?;
    create_table(db, &schema, Modifier).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, OrderItem).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, SystemState).await?;

    db.execute_unprepared(ONE_OPEN_ORDER_PER_TABLE).await?;
    db.execute_unprepared(ORDER_ITEMS_BY_ORDER).await?;

    info!("Database tables ensured.");
    Ok(())
}
