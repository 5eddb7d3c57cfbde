//! Restaurant lookups and seeding.
//!
//! The engine only ever reads a restaurant's tax rates. Seeding from config.toml is
//! idempotent: restaurants are matched by name and updated in place, tables are matched by
//! label and only created when missing.

use crate::{
    config::RestaurantConfig,
    core::tax::TaxRates,
    entities::{DiningTable, Restaurant, dining_table, restaurant},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Current tax rates of a restaurant.
pub async fn get_tax_rates<C>(db: &C, restaurant_id: i64) -> Result<TaxRates>
where
    C: ConnectionTrait,
{
    let restaurant = Restaurant::find_by_id(restaurant_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "restaurant",
            id: restaurant_id,
        })?;
    Ok(TaxRates::from(&restaurant))
}

/// Finds a restaurant by its unique name.
pub async fn get_restaurant_by_name<C>(db: &C, name: &str) -> Result<Option<restaurant::Model>>
where
    C: ConnectionTrait,
{
    Restaurant::find()
        .filter(restaurant::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates or updates one configured restaurant and its tables.
///
/// Existing tables keep their current status; only missing labels are added.
pub async fn seed_restaurant(
    db: &DatabaseConnection,
    config: &RestaurantConfig,
) -> Result<restaurant::Model> {
    let name = config.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Restaurant name cannot be empty"));
    }

    let txn = db.begin().await?;
    let now = Utc::now();

    let restaurant = match get_restaurant_by_name(&txn, name).await? {
        Some(existing) => {
            debug!("Restaurant '{}' exists, refreshing rates", name);
            let mut active_model: restaurant::ActiveModel = existing.into();
            active_model.gst_rate_percent = Set(config.gst_rate_percent);
            active_model.service_rate_percent = Set(config.service_rate_percent);
            active_model.updated_at = Set(now);
            active_model.update(&txn).await?
        }
        None => {
            info!("Seeding restaurant '{}'", name);
            restaurant::ActiveModel {
                name: Set(name.to_string()),
                gst_rate_percent: Set(config.gst_rate_percent),
                service_rate_percent: Set(config.service_rate_percent),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let existing_labels: Vec<String> = DiningTable::find()
        .filter(dining_table::Column::RestaurantId.eq(restaurant.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| t.label)
        .collect();

    for label in &config.tables {
        if existing_labels.iter().any(|l| l == label) {
            continue;
        }
        dining_table::ActiveModel {
            restaurant_id: Set(restaurant.id),
            label: Set(label.clone()),
            status: Set(dining_table::TableStatus::Available),
            assigned_staff: Set(None),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok(restaurant)
}

/// Seeds every configured restaurant.
pub async fn seed_restaurants(
    db: &DatabaseConnection,
    configs: &[RestaurantConfig],
) -> Result<Vec<restaurant::Model>> {
    info!(
        "Seeding restaurants. Found {} configurations from TOML.",
        configs.len()
    );
    let mut seeded = Vec::with_capacity(configs.len());
    for config in configs {
        seeded.push(seed_restaurant(db, config).await?);
    }
    Ok(seeded)
}
