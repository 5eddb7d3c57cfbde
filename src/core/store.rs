//! Order row access shared by every mutation.
//!
//! A mutation always starts with [`claim_order`] inside its database transaction. The claim is
//! an atomic conditional update of the order row, which takes the row's write lock until the
//! transaction ends, so the read that follows is current and no concurrent mutation of the same
//! order can interleave with the recomputation.

use crate::{
    core::{lifecycle::check_combination, money::round_money},
    entities::{Order, OrderItem, order, order_item},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, QueryOrder, prelude::*, sea_query::Expr};

/// Loads an order within the restaurant scope without locking it.
pub async fn find_order<C>(db: &C, restaurant_id: i64, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "order",
            id: order_id,
        })
}

/// Locks the order row for the rest of the transaction and returns its current state.
pub async fn claim_order<C>(db: &C, restaurant_id: i64, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let claimed = Order::update_many()
        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "order",
            id: order_id,
        });
    }
    find_order(db, restaurant_id, order_id).await
}

/// Line items of an order in insertion order.
pub async fn load_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of line totals.
#[must_use]
pub fn items_subtotal(items: &[order_item::Model]) -> Decimal {
    round_money(items.iter().map(|i| i.total_price).sum())
}

/// Writes every column of `order` back, after checking its lifecycle combination.
pub async fn save_order<C>(db: &C, mut order: order::Model) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    check_combination(&order)?;
    order.updated_at = Utc::now();
    order::ActiveModel::from(order)
        .reset_all()
        .update(db)
        .await
        .map_err(Into::into)
}
