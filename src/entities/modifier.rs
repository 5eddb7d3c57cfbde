//! Modifier entity - An add-on that increases a line's unit price additively.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Modifier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "modifiers")]
pub struct Model {
    /// Unique identifier for the modifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning restaurant
    pub restaurant_id: i64,
    /// Modifier name (e.g. "Extra cheese")
    pub name: String,
    /// Price added per unit
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    /// Group the modifier is shown under
    pub group_name: Option<String>,
}

/// Defines relationships between Modifier and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each modifier belongs to one restaurant
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
