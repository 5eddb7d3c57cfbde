//! Table occupancy tracker.
//!
//! A table's AVAILABLE/OCCUPIED state follows from its open dine-in orders. Writes are
//! conditional on the state the tracker expects to replace, so a RESERVED or BLOCKED table set
//! by an administrator in the meantime is never overwritten. Occupancy is updated after the
//! order transaction commits; a short lag behind the orders is tolerated and corrected by the
//! next refresh.

use crate::{
    entities::{
        DiningTable, Order, dining_table,
        dining_table::TableStatus,
        order::{self, OrderStatus, OrderType},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, Select, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Open, non-cancelled dine-in orders running on a table.
pub fn open_orders_for_table(restaurant_id: i64, table_id: i64) -> Select<Order> {
    Order::find()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .filter(order::Column::TableId.eq(table_id))
        .filter(order::Column::OrderType.eq(OrderType::DineIn))
        .filter(order::Column::Closed.eq(false))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
}

/// Loads a table within the restaurant scope.
pub async fn get_table<C>(db: &C, restaurant_id: i64, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    DiningTable::find_by_id(table_id)
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "table",
            id: table_id,
        })
}

/// Takes the table row's write lock for the rest of the transaction and returns the row.
///
/// Placing an order claims its table first, so two placements for the same table cannot
/// both decide that no running bill exists.
pub async fn claim_table<C>(db: &C, restaurant_id: i64, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    let claimed = DiningTable::update_many()
        .col_expr(dining_table::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(dining_table::Column::Id.eq(table_id))
        .filter(dining_table::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "table",
            id: table_id,
        });
    }
    get_table(db, restaurant_id, table_id).await
}

/// Number of orders currently holding the table.
pub async fn count_open_orders<C>(db: &C, restaurant_id: i64, table_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    open_orders_for_table(restaurant_id, table_id)
        .count(db)
        .await
        .map_err(Into::into)
}

/// Flips `table` from `from` to `to` if it is still in `from`. Returns whether it changed.
async fn transition<C>(
    db: &C,
    table_id: i64,
    from: TableStatus,
    to: TableStatus,
    staff: Option<String>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = DiningTable::update_many()
        .col_expr(dining_table::Column::Status, Expr::value(to))
        .col_expr(dining_table::Column::AssignedStaff, Expr::value(staff))
        .col_expr(dining_table::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(dining_table::Column::Id.eq(table_id))
        .filter(dining_table::Column::Status.eq(from))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Marks a table OCCUPIED for a new or merged order, stamping the serving staff member.
///
/// Returns the updated row when the status changed. An already occupied table only gets a
/// staff stamp if it has none; RESERVED and BLOCKED tables are left alone.
pub async fn mark_occupied<C>(
    db: &C,
    restaurant_id: i64,
    table_id: i64,
    staff: Option<&str>,
) -> Result<Option<dining_table::Model>>
where
    C: ConnectionTrait,
{
    let table = get_table(db, restaurant_id, table_id).await?;
    match table.status {
        TableStatus::Available => {
            if transition(
                db,
                table_id,
                TableStatus::Available,
                TableStatus::Occupied,
                staff.map(str::to_string),
            )
            .await?
            {
                info!("Table {} is now OCCUPIED", table.label);
                return get_table(db, restaurant_id, table_id).await.map(Some);
            }
            Ok(None)
        }
        TableStatus::Occupied => {
            if let (Some(staff), None) = (staff, table.assigned_staff.as_ref()) {
                DiningTable::update_many()
                    .col_expr(dining_table::Column::AssignedStaff, Expr::value(staff))
                    .filter(dining_table::Column::Id.eq(table_id))
                    .filter(dining_table::Column::AssignedStaff.is_null())
                    .exec(db)
                    .await?;
            }
            Ok(None)
        }
        TableStatus::Reserved | TableStatus::Blocked => {
            debug!(
                "Table {} is {}; leaving administrative state untouched",
                table.label, table.status
            );
            Ok(None)
        }
    }
}

/// Re-derives a table's state from its open orders.
///
/// Frees an OCCUPIED table with no open orders (clearing the staff assignment) and occupies an
/// AVAILABLE table that has one. Returns the updated row when the status changed.
pub async fn refresh_occupancy<C>(
    db: &C,
    restaurant_id: i64,
    table_id: i64,
) -> Result<Option<dining_table::Model>>
where
    C: ConnectionTrait,
{
    let table = get_table(db, restaurant_id, table_id).await?;
    if !table.status.is_order_driven() {
        return Ok(None);
    }

    let open = count_open_orders(db, restaurant_id, table_id).await?;
    let changed = match (table.status, open) {
        (TableStatus::Occupied, 0) => {
            transition(db, table_id, TableStatus::Occupied, TableStatus::Available, None).await?
        }
        (TableStatus::Available, n) if n > 0 => {
            transition(
                db,
                table_id,
                TableStatus::Available,
                TableStatus::Occupied,
                table.assigned_staff.clone(),
            )
            .await?
        }
        _ => false,
    };

    if changed {
        let updated = get_table(db, restaurant_id, table_id).await?;
        info!(
            "Table {} {} -> {} ({} open orders)",
            updated.label, table.status, updated.status, open
        );
        Ok(Some(updated))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_mark_occupied_and_refresh() -> Result<()> {
        let db = setup_test_db().await?;
        let restaurant = create_test_restaurant(&db, "Ours").await?;
        let table = create_test_table(&db, restaurant.id, "T1").await?;

        let changed = mark_occupied(&db, restaurant.id, table.id, Some("waiter-7")).await?;
        let changed = changed.unwrap();
        assert_eq!(changed.status, TableStatus::Occupied);
        assert_eq!(changed.assigned_staff.as_deref(), Some("waiter-7"));

        // Marking again is a no-op
        assert!(mark_occupied(&db, restaurant.id, table.id, None).await?.is_none());

        // No orders hold it, so a refresh frees it and clears the staff
        let freed = refresh_occupancy(&db, restaurant.id, table.id).await?.unwrap();
        assert_eq!(freed.status, TableStatus::Available);
        assert!(freed.assigned_staff.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_administrative_states_never_clobbered() -> Result<()> {
        let db = setup_test_db().await?;
        let restaurant = create_test_restaurant(&db, "Ours").await?;
        let reserved = create_table_with_status(&db, restaurant.id, "T2", TableStatus::Reserved).await?;
        let blocked = create_table_with_status(&db, restaurant.id, "T3", TableStatus::Blocked).await?;

        for table in [&reserved, &blocked] {
            assert!(mark_occupied(&db, restaurant.id, table.id, Some("x")).await?.is_none());
            assert!(refresh_occupancy(&db, restaurant.id, table.id).await?.is_none());
            let reloaded = get_table(&db, restaurant.id, table.id).await?;
            assert_eq!(reloaded.status, table.status);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_table_scoped_to_restaurant() -> Result<()> {
        let db = setup_test_db().await?;
        let ours = create_test_restaurant(&db, "Ours").await?;
        let theirs = create_test_restaurant(&db, "Theirs").await?;
        let table = create_test_table(&db, theirs.id, "T1").await?;

        let err = claim_table(&db, ours.id, table.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "table", .. }));
        Ok(())
    }
}
