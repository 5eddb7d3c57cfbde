//! Transaction entity - The bill, i.e. the single settlement record of an order.
//!
//! At most one row exists per `order_id`. Amounts mirror the order at the last sync; the tax
//! rates are the restaurant's rates when the bill was first written and are kept for audit.
use super::order::PaymentMethod;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction (bill) database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order this bill settles; unique
    #[sea_orm(unique)]
    pub order_id: i64,
    /// Restaurant the order belongs to
    pub restaurant_id: i64,
    /// Human-readable bill number; unique
    #[sea_orm(unique)]
    pub bill_number: String,
    /// Order subtotal at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    /// GST at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub gst_amount: Decimal,
    /// Service charge at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub service_amount: Decimal,
    /// Discount at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount_amount: Decimal,
    /// Order total at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub grand_total: Decimal,
    /// Money collected at last sync
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub paid_amount: Decimal,
    /// GST rate in effect when the bill was created
    #[sea_orm(column_type = "Decimal(Some((6, 3)))")]
    pub gst_rate_percent: Decimal,
    /// Service rate in effect when the bill was created
    #[sea_orm(column_type = "Decimal(Some((6, 3)))")]
    pub service_rate_percent: Decimal,
    /// Method of the latest payment
    pub payment_method: PaymentMethod,
    /// External payment reference (terminal slip, gateway id)
    pub payment_reference: Option<String>,
    /// When the latest payment was recorded
    pub paid_at: DateTimeUtc,
    /// When the bill was first written
    pub created_at: DateTimeUtc,
    /// Last sync
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bill belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
