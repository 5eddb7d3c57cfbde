//! Order entity - One running bill for a dine-in table, takeaway or delivery guest.
//!
//! An order carries three orthogonal lifecycle axes: the kitchen workflow `status`, the
//! `payment_status` derived from `paid_amount` vs `total_amount`, and the `closed` flag that
//! marks bill finality. All money columns are stored with 2-decimal precision.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the order is served.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Served at a table; the only type that holds a table
    #[sea_orm(string_value = "DINE_IN")]
    DineIn,
    /// Picked up by the guest
    #[sea_orm(string_value = "TAKEAWAY")]
    Takeaway,
    /// Delivered to the guest
    #[sea_orm(string_value = "DELIVERY")]
    Delivery,
}

/// Kitchen workflow stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, not started
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// In the kitchen
    #[sea_orm(string_value = "PREPARING")]
    Preparing,
    /// Ready to serve
    #[sea_orm(string_value = "READY")]
    Ready,
    /// Delivered to the guest
    #[sea_orm(string_value = "SERVED")]
    Served,
    /// Served and settled
    #[sea_orm(string_value = "PAID")]
    Paid,
    /// Terminal; carries a cancel reason
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    /// Position along the forward workflow; `None` for `Cancelled`.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Ready => Some(2),
            Self::Served => Some(3),
            Self::Paid => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Database/wire spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Served => "SERVED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state, a pure function of paid vs total.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing paid
    #[default]
    #[sea_orm(string_value = "DUE")]
    Due,
    /// Something paid, not everything
    #[sea_orm(string_value = "PARTIALLY_PAID")]
    PartiallyPaid,
    /// Settled within tolerance
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Due => "DUE",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
        })
    }
}

/// How money was (or will be) collected. `Due` means no payment has been taken.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// No payment collected yet
    #[default]
    #[sea_orm(string_value = "DUE")]
    Due,
    /// Cash at the counter
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Card terminal
    #[sea_orm(string_value = "CARD")]
    Card,
    /// UPI transfer
    #[sea_orm(string_value = "UPI")]
    Upi,
    /// Online gateway
    #[sea_orm(string_value = "ONLINE")]
    Online,
}

impl PaymentMethod {
    /// Whether this method represents money actually collected.
    #[must_use]
    pub const fn is_settlement(self) -> bool {
        !matches!(self, Self::Due)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Due => "DUE",
            Self::Cash => "CASH",
            Self::Card => "CARD",
            Self::Upi => "UPI",
            Self::Online => "ONLINE",
        })
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning restaurant (tenant scope)
    pub restaurant_id: i64,
    /// Table the order is running on; only set for dine-in orders
    pub table_id: Option<i64>,
    /// Dine-in, takeaway or delivery
    pub order_type: OrderType,
    /// Kitchen workflow stage
    pub status: OrderStatus,
    /// Derived settlement state
    pub payment_status: PaymentStatus,
    /// Last method money was collected with
    pub payment_method: PaymentMethod,
    /// Sum of line item totals
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    /// GST on the subtotal
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub gst_amount: Decimal,
    /// Service charge on the subtotal (dine-in only, zero when waived)
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub service_amount: Decimal,
    /// Flat discount, clamped so the total never goes negative
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount_amount: Decimal,
    /// Grand total owed
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
    /// Money collected so far
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub paid_amount: Decimal,
    /// Service charge explicitly waived for this order
    pub service_charge_waived: bool,
    /// Bill finality; never goes back to false
    pub closed: bool,
    /// Why the order was cancelled
    pub cancel_reason: Option<String>,
    /// Name the guest gave
    pub guest_name: Option<String>,
    /// Free-form order notes
    pub notes: Option<String>,
    /// Staff member who placed the order
    pub placed_by: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// Last write to the order row
    pub updated_at: DateTimeUtc,
    /// When the order was settled, cancelled or closed
    pub closed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one restaurant
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
    /// A dine-in order runs on one table
    #[sea_orm(
        belongs_to = "super::dining_table::Entity",
        from = "Column::TableId",
        to = "super::dining_table::Column::Id"
    )]
    DiningTable,
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    /// One order has at most one bill
    #[sea_orm(has_one = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl Related<super::dining_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiningTable.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
