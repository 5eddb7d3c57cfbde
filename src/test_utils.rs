//! Shared test utilities for the order ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating restaurants, tables, menu rows and orders with sensible defaults.

use crate::{
    config::Config,
    core::{
        engine::OrderEngine,
        events::RecordingSink,
        order::PlaceOrderRequest,
        payment::PaymentUpdate,
        pricing::LineRequest,
        tax::{TaxRates, compute_charges},
    },
    entities::{
        Transaction,
        dining_table::{self, TableStatus},
        item_variant, menu_item, modifier,
        order::{self, OrderStatus, OrderType, PaymentMethod, PaymentStatus},
        restaurant, transaction,
    },
    errors::Result,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, DatabaseConnection, PaginatorTrait, Set, prelude::*};
use std::{path::PathBuf, sync::Arc};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A file-backed `SQLite` database behind a pool of several connections.
///
/// Unlike `sqlite::memory:`, which runs on a single pooled connection, concurrent operations
/// here really hold separate connections and contend for the same rows. The file is removed
/// when the value is dropped.
pub struct PooledTestDb {
    /// Pooled connection
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for PooledTestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Creates a [`PooledTestDb`] with up to `max_connections` connections and all tables
/// initialized.
pub async fn setup_pooled_test_db(max_connections: u32) -> Result<PooledTestDb> {
    let path = std::env::temp_dir().join(format!(
        "order_ledger_test_{}_{}.sqlite",
        std::process::id(),
        rand::random::<u64>()
    ));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(max_connections)
        .min_connections(max_connections)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(PooledTestDb { db, path })
}

/// Creates a test restaurant.
///
/// # Defaults
/// * `gst_rate_percent`: 5
/// * `service_rate_percent`: 10
pub async fn create_test_restaurant(
    db: &DatabaseConnection,
    name: &str,
) -> Result<restaurant::Model> {
    let now = Utc::now();
    restaurant::ActiveModel {
        name: Set(name.to_string()),
        gst_rate_percent: Set(dec!(5)),
        service_rate_percent: Set(dec!(10)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Changes a restaurant's rates, as an admin edit would.
pub async fn set_restaurant_rates(
    db: &DatabaseConnection,
    restaurant: restaurant::Model,
    gst: Decimal,
    service: Decimal,
) -> Result<restaurant::Model> {
    let mut active_model: restaurant::ActiveModel = restaurant.into();
    active_model.gst_rate_percent = Set(gst);
    active_model.service_rate_percent = Set(service);
    active_model.updated_at = Set(Utc::now());
    active_model.update(db).await.map_err(Into::into)
}

/// Creates an AVAILABLE table with no staff assigned.
pub async fn create_test_table(
    db: &DatabaseConnection,
    restaurant_id: i64,
    label: &str,
) -> Result<dining_table::Model> {
    create_table_with_status(db, restaurant_id, label, TableStatus::Available).await
}

/// Creates a table in the given status.
/// Use this for RESERVED or BLOCKED tables, which orders never flip.
pub async fn create_table_with_status(
    db: &DatabaseConnection,
    restaurant_id: i64,
    label: &str,
    status: TableStatus,
) -> Result<dining_table::Model> {
    dining_table::ActiveModel {
        restaurant_id: Set(restaurant_id),
        label: Set(label.to_string()),
        status: Set(status),
        assigned_staff: Set(None),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn insert_menu_item(
    db: &DatabaseConnection,
    restaurant_id: i64,
    name: &str,
    price: Decimal,
    is_available: bool,
) -> Result<menu_item::Model> {
    menu_item::ActiveModel {
        restaurant_id: Set(restaurant_id),
        name: Set(name.to_string()),
        price: Set(price),
        is_available: Set(is_available),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an orderable menu item.
pub async fn create_test_menu_item(
    db: &DatabaseConnection,
    restaurant_id: i64,
    name: &str,
    price: Decimal,
) -> Result<menu_item::Model> {
    insert_menu_item(db, restaurant_id, name, price, true).await
}

/// Creates a menu item that is switched off.
pub async fn create_unavailable_menu_item(
    db: &DatabaseConnection,
    restaurant_id: i64,
    name: &str,
    price: Decimal,
) -> Result<menu_item::Model> {
    insert_menu_item(db, restaurant_id, name, price, false).await
}

/// Creates a variant of a menu item.
pub async fn create_test_variant(
    db: &DatabaseConnection,
    menu_item_id: i64,
    name: &str,
    price: Decimal,
) -> Result<item_variant::Model> {
    item_variant::ActiveModel {
        menu_item_id: Set(menu_item_id),
        name: Set(name.to_string()),
        price: Set(price),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a modifier in the "Extras" group.
pub async fn create_test_modifier(
    db: &DatabaseConnection,
    restaurant_id: i64,
    name: &str,
    price: Decimal,
) -> Result<modifier::Model> {
    modifier::ActiveModel {
        restaurant_id: Set(restaurant_id),
        name: Set(name.to_string()),
        price: Set(price),
        group_name: Set(Some("Extras".to_string())),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Writes an order row directly, bypassing the engine. It has no line items.
///
/// # Defaults
/// * `order_type`: takeaway
/// * `status`: PENDING, nothing paid
/// * charges computed from the restaurant's current rates
pub async fn create_test_order(
    db: &DatabaseConnection,
    restaurant_id: i64,
    subtotal: Decimal,
) -> Result<order::Model> {
    let rates = crate::core::restaurant::get_tax_rates(db, restaurant_id).await?;
    let charges = compute_charges(subtotal, rates, OrderType::Takeaway, Decimal::ZERO, false);
    let now = Utc::now();
    order::ActiveModel {
        restaurant_id: Set(restaurant_id),
        table_id: Set(None),
        order_type: Set(OrderType::Takeaway),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Due),
        payment_method: Set(PaymentMethod::Due),
        subtotal: Set(charges.subtotal),
        gst_amount: Set(charges.gst),
        service_amount: Set(charges.service),
        discount_amount: Set(charges.discount),
        total_amount: Set(charges.total),
        paid_amount: Set(Decimal::ZERO),
        service_charge_waived: Set(false),
        closed: Set(false),
        cancel_reason: Set(None),
        guest_name: Set(None),
        notes: Set(None),
        placed_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        closed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// An in-memory dine-in order model for pure rule checks.
#[must_use]
pub fn order_model(status: OrderStatus, payment_status: PaymentStatus) -> order::Model {
    let rates = TaxRates {
        gst_rate_percent: dec!(5),
        service_rate_percent: dec!(10),
    };
    let charges = compute_charges(dec!(400), rates, OrderType::DineIn, Decimal::ZERO, false);
    let paid = match payment_status {
        PaymentStatus::Due => Decimal::ZERO,
        PaymentStatus::PartiallyPaid => dec!(100),
        PaymentStatus::Paid => charges.total,
    };
    let now = Utc::now();
    order::Model {
        id: 1,
        restaurant_id: 1,
        table_id: Some(1),
        order_type: OrderType::DineIn,
        status,
        payment_status,
        payment_method: PaymentMethod::Due,
        subtotal: charges.subtotal,
        gst_amount: charges.gst,
        service_amount: charges.service,
        discount_amount: charges.discount,
        total_amount: charges.total,
        paid_amount: paid,
        service_charge_waived: false,
        closed: false,
        cancel_reason: None,
        guest_name: None,
        notes: None,
        placed_by: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    }
}

/// An engine with default settings that records its events.
#[must_use]
pub fn test_engine(db: DatabaseConnection) -> (OrderEngine, RecordingSink) {
    engine_with_config(db, &Config::default())
}

fn engine_with_config(db: DatabaseConnection, config: &Config) -> (OrderEngine, RecordingSink) {
    let sink = RecordingSink::new();
    let engine = OrderEngine::new(db, config).with_event_sink(Arc::new(sink.clone()));
    (engine, sink)
}

/// How many bills exist for an order. Never more than one.
pub async fn count_bills(db: &DatabaseConnection, order_id: i64) -> Result<u64> {
    Transaction::find()
        .filter(transaction::Column::OrderId.eq(order_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// A restaurant with one table and two dishes, behind a recording engine.
///
/// # Defaults
/// * rates: gst 5%, service 10%
/// * `table`: "T1", AVAILABLE
/// * `dish`: "Paneer Tikka" at 200
/// * `side`: "Garlic Naan" at 100
pub struct Fixture {
    /// Engine under test
    pub engine: OrderEngine,
    /// Everything the engine emitted
    pub sink: RecordingSink,
    /// The restaurant all rows belong to
    pub restaurant: restaurant::Model,
    /// A dine-in table
    pub table: dining_table::Model,
    /// Main course priced 200
    pub dish: menu_item::Model,
    /// Side priced 100
    pub side: menu_item::Model,
}

impl Fixture {
    /// Sets up the fixture on a fresh database with default settings.
    pub async fn new() -> Result<Self> {
        let db = setup_test_db().await?;
        Self::with_config(db, &Config::default()).await
    }

    /// Sets up the fixture on `db` with the given settings.
    pub async fn with_config(db: DatabaseConnection, config: &Config) -> Result<Self> {
        let restaurant = create_test_restaurant(&db, "Spice Route").await?;
        let table = create_test_table(&db, restaurant.id, "T1").await?;
        let dish = create_test_menu_item(&db, restaurant.id, "Paneer Tikka", dec!(200)).await?;
        let side = create_test_menu_item(&db, restaurant.id, "Garlic Naan", dec!(100)).await?;
        let (engine, sink) = engine_with_config(db, config);
        Ok(Self {
            engine,
            sink,
            restaurant,
            table,
            dish,
            side,
        })
    }

    /// Places two dishes at the table, serves them and takes cash for the 460 total.
    /// Returns the order id.
    pub async fn served_paid_order(&self) -> Result<i64> {
        let placed = self
            .engine
            .place_order(
                self.restaurant.id,
                PlaceOrderRequest::dine_in(self.table.id, vec![LineRequest::new(self.dish.id, 2)]),
            )
            .await?;
        let order_id = placed.details.order.id;
        self.engine
            .update_status(self.restaurant.id, order_id, OrderStatus::Served)
            .await?;
        self.engine
            .update_payment_status(
                self.restaurant.id,
                order_id,
                PaymentUpdate::paid(PaymentMethod::Cash),
            )
            .await?;
        Ok(order_id)
    }
}
