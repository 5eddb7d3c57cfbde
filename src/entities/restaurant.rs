//! Restaurant entity - The tenant, and the source of tax rates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Restaurant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurants")]
pub struct Model {
    /// Unique identifier for the restaurant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name; unique, used to seed idempotently
    #[sea_orm(unique)]
    pub name: String,
    /// GST rate as a percentage (5 means 5%)
    #[sea_orm(column_type = "Decimal(Some((6, 3)))")]
    pub gst_rate_percent: Decimal,
    /// Dine-in service charge rate as a percentage
    #[sea_orm(column_type = "Decimal(Some((6, 3)))")]
    pub service_rate_percent: Decimal,
    /// When the restaurant was created
    pub created_at: DateTimeUtc,
    /// When the rates were last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Restaurant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One restaurant has many tables
    #[sea_orm(has_many = "super::dining_table::Entity")]
    DiningTables,
    /// One restaurant has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::dining_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiningTables.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
