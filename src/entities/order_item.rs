//! Order item entity - A priced line item snapshot.
//!
//! Names and prices are copied from the catalog when the line is written and never re-read,
//! so later menu edits do not change what an existing bill says.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Frozen copy of one selected modifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    /// Catalog id of the modifier
    pub id: i64,
    /// Name at order time
    pub name: String,
    /// Price at order time
    pub price: Decimal,
    /// Modifier group (e.g. "Toppings")
    pub group: Option<String>,
}

/// JSON column holding all modifier snapshots of a line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ModifierSnapshots(pub Vec<ModifierSnapshot>);

/// Order item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order this line belongs to
    pub order_id: i64,
    /// Catalog item the line was priced from
    pub menu_item_id: i64,
    /// Item name at order time
    pub item_name: String,
    /// Per-unit price after variant substitution
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    /// Number of units, always positive
    pub quantity: i32,
    /// Sum of modifier prices per unit
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub customization_amount: Decimal,
    /// `(unit_price + customization_amount) * quantity`
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    /// Selected variant, if any
    pub variant_id: Option<i64>,
    /// Variant name at order time
    pub variant_name: Option<String>,
    /// Variant price at order time
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub variant_price: Option<Decimal>,
    /// Selected modifiers at order time
    pub modifiers: ModifierSnapshots,
    /// Kitchen notes for this line
    pub notes: Option<String>,
    /// When the line was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `OrderItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    /// Each line was priced from one catalog item
    #[sea_orm(
        belongs_to = "super::menu_item::Entity",
        from = "Column::MenuItemId",
        to = "super::menu_item::Column::Id"
    )]
    MenuItem,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
