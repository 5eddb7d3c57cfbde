//! Dining table entity - Occupancy is derived from open orders; RESERVED and BLOCKED are
//! administrative overrides the order flow never writes over.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table occupancy state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    /// No open dine-in order
    #[sea_orm(string_value = "AVAILABLE")]
    Available,
    /// At least one open dine-in order
    #[sea_orm(string_value = "OCCUPIED")]
    Occupied,
    /// Held for a booking
    #[sea_orm(string_value = "RESERVED")]
    Reserved,
    /// Taken out of service
    #[sea_orm(string_value = "BLOCKED")]
    Blocked,
}

impl TableStatus {
    /// Whether the order flow is allowed to change this state.
    #[must_use]
    pub const fn is_order_driven(self) -> bool {
        matches!(self, Self::Available | Self::Occupied)
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "AVAILABLE",
            Self::Occupied => "OCCUPIED",
            Self::Reserved => "RESERVED",
            Self::Blocked => "BLOCKED",
        })
    }
}

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    /// Unique identifier for the table
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning restaurant
    pub restaurant_id: i64,
    /// Label printed on the table (e.g. "T4")
    pub label: String,
    /// Occupancy state
    pub status: TableStatus,
    /// Staff member serving the table while occupied
    pub assigned_staff: Option<String>,
    /// Last write to the row
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `DiningTable` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each table belongs to one restaurant
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
    /// One table has many orders over time
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
