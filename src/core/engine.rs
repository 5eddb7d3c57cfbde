//! The order engine - entry point for every order mutation and read.
//!
//! Each mutation follows the same shape: open a database transaction, claim the order (or, on
//! placement, the table) row, re-read, validate against the lifecycle rules, recompute derived
//! totals, write, commit. Only after the commit do the follow-up steps run: the billing ledger
//! sync, the table occupancy update and event emission. A follow-up failure is logged and
//! reported in the [`OrderOutcome`] but never undoes the committed order change.

use crate::{
    config::{Config, EngineSettings},
    core::{
        bill_number::{self, BillNumbering},
        events::{EventKind, EventSink, NoopSink, OrderEvent},
        ledger,
        store::{find_order, load_items},
        table::{self, open_orders_for_table},
    },
    entities::{
        Order,
        order::{self, PaymentMethod},
        order_item, transaction,
    },
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    /// The order row
    pub order: order::Model,
    /// Its line items, oldest first
    pub items: Vec<order_item::Model>,
}

/// What happened to the order's bill as a follow-up of a mutation.
#[derive(Debug)]
pub enum LedgerSync {
    /// The mutation did not call for a bill write
    NotRequired,
    /// The bill was created or updated
    Synced(Box<transaction::Model>),
    /// The bill could not be written; the order change itself is committed
    Failed(Error),
}

impl LedgerSync {
    /// The bill written, if any.
    #[must_use]
    pub fn bill(&self) -> Option<&transaction::Model> {
        match self {
            Self::Synced(bill) => Some(bill),
            Self::NotRequired | Self::Failed(_) => None,
        }
    }

    /// Whether the bill write failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Collapses the follow-up into a `Result`, for callers that treat a failed bill write as
    /// an error after all.
    pub fn into_result(self) -> Result<Option<transaction::Model>> {
        match self {
            Self::NotRequired => Ok(None),
            Self::Synced(bill) => Ok(Some(*bill)),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Result of a mutation that may touch the bill.
#[derive(Debug)]
pub struct OrderOutcome {
    /// The order as committed
    pub details: OrderDetails,
    /// True when a placement was folded into the table's running order
    pub merged: bool,
    /// Ledger follow-up
    pub ledger: LedgerSync,
}

/// Entry point for order operations. Cheap to clone; clones share the connection pool and sinks.
#[derive(Clone)]
pub struct OrderEngine {
    pub(crate) db: DatabaseConnection,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) numbering: Arc<dyn BillNumbering>,
    pub(crate) settings: EngineSettings,
}

impl OrderEngine {
    /// Creates an engine with the configured policies and bill numbering, emitting no events.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        Self {
            db,
            events: Arc::new(NoopSink),
            numbering: bill_number::from_settings(&config.billing),
            settings: config.engine.clone(),
        }
    }

    /// Routes lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Replaces the bill-numbering strategy.
    #[must_use]
    pub fn with_bill_numbering(mut self, numbering: Arc<dyn BillNumbering>) -> Self {
        self.numbering = numbering;
        self
    }

    /// The underlying connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Active lifecycle policies.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// An order and its items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, restaurant_id: i64, order_id: i64) -> Result<OrderDetails> {
        let order = find_order(&self.db, restaurant_id, order_id).await?;
        load_details(&self.db, order).await
    }

    /// The running order of a table, if there is one.
    #[instrument(skip(self))]
    pub async fn find_open_order_for_table(
        &self,
        restaurant_id: i64,
        table_id: i64,
    ) -> Result<Option<OrderDetails>> {
        let order = open_orders_for_table(restaurant_id, table_id)
            .order_by_desc(order::Column::CreatedAt)
            .one(&self.db)
            .await?;
        match order {
            Some(order) => load_details(&self.db, order).await.map(Some),
            None => Ok(None),
        }
    }

    /// Every open, non-cancelled order of a restaurant, oldest first.
    #[instrument(skip(self))]
    pub async fn list_open_orders(&self, restaurant_id: i64) -> Result<Vec<order::Model>> {
        Order::find()
            .filter(order::Column::RestaurantId.eq(restaurant_id))
            .filter(order::Column::Closed.eq(false))
            .filter(order::Column::Status.ne(order::OrderStatus::Cancelled))
            .order_by_asc(order::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    pub(crate) fn emit<T: Serialize>(&self, kind: EventKind, restaurant_id: i64, payload: &T) {
        self.events.emit(OrderEvent::new(kind, restaurant_id, payload));
    }

    /// Writes the bill after a committed payment change.
    pub(crate) async fn sync_ledger(
        &self,
        order: &order::Model,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> LedgerSync {
        match ledger::sync_transaction(
            &self.db,
            self.numbering.as_ref(),
            order.restaurant_id,
            order.id,
            method,
            reference,
        )
        .await
        {
            Ok(bill) => LedgerSync::Synced(Box::new(bill)),
            Err(e) => {
                warn!("Bill sync failed for order {}: {}", order.id, e);
                LedgerSync::Failed(Error::LedgerSync {
                    order_id: order.id,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Re-copies amounts onto an existing bill after a committed amount change.
    pub(crate) async fn reconcile_ledger(&self, order: &order::Model) -> LedgerSync {
        match ledger::reconcile_transaction(&self.db, order.restaurant_id, order.id).await {
            Ok(Some(bill)) => LedgerSync::Synced(Box::new(bill)),
            Ok(None) => LedgerSync::NotRequired,
            Err(e) => {
                warn!("Bill reconciliation failed for order {}: {}", order.id, e);
                LedgerSync::Failed(Error::LedgerSync {
                    order_id: order.id,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Marks the order's table occupied after a committed placement or merge.
    pub(crate) async fn occupy_table(&self, order: &order::Model) {
        let Some(table_id) = order.table_id else {
            return;
        };
        match table::mark_occupied(
            &self.db,
            order.restaurant_id,
            table_id,
            order.placed_by.as_deref(),
        )
        .await
        {
            Ok(Some(table)) => {
                self.emit(EventKind::TableStatusChanged, order.restaurant_id, &table);
            }
            Ok(None) => {}
            Err(e) => warn!("Could not occupy table {} for order {}: {}", table_id, order.id, e),
        }
    }

    /// Re-derives the order's table state after the order stopped (or may have stopped)
    /// holding it.
    pub(crate) async fn refresh_table(&self, order: &order::Model) {
        let Some(table_id) = order.table_id else {
            return;
        };
        match table::refresh_occupancy(&self.db, order.restaurant_id, table_id).await {
            Ok(Some(table)) => {
                self.emit(EventKind::TableStatusChanged, order.restaurant_id, &table);
            }
            Ok(None) => debug!("Table {} unchanged after order {}", table_id, order.id),
            Err(e) => warn!("Could not refresh table {} after order {}: {}", table_id, order.id, e),
        }
    }
}

/// Attaches the items to an order.
pub(crate) async fn load_details<C>(db: &C, order: order::Model) -> Result<OrderDetails>
where
    C: ConnectionTrait,
{
    let items = load_items(db, order.id).await?;
    Ok(OrderDetails { order, items })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::events::RecordingSink, test_utils::*};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_get_order_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let engine = OrderEngine::new(db, &Config::default());

        let err = engine.get_order(1, 99).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: "order",
                id: 99
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_open_orders_is_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let ours = create_test_restaurant(&db, "Ours").await?;
        let theirs = create_test_restaurant(&db, "Theirs").await?;
        create_test_order(&db, ours.id, dec!(100)).await?;
        create_test_order(&db, ours.id, dec!(50)).await?;
        create_test_order(&db, theirs.id, dec!(75)).await?;

        let (engine, _sink) = test_engine(db);
        assert_eq!(engine.list_open_orders(ours.id).await?.len(), 2);
        assert_eq!(engine.list_open_orders(theirs.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ledger_is_reported_not_raised() -> Result<()> {
        let db = setup_test_db().await?;
        let restaurant = create_test_restaurant(&db, "Ours").await?;
        let order = create_test_order(&db, restaurant.id, dec!(100)).await?;
        let engine = OrderEngine::new(db, &Config::default())
            .with_event_sink(Arc::new(RecordingSink::new()))
            .with_bill_numbering(Arc::new(crate::core::bill_number::RandomBillNumbers::new(
                "INV", 1,
            )));

        // A bill for an order that no longer resolves cannot be written
        let mut ghost = order.clone();
        ghost.id = order.id + 1000;
        let sync = engine.sync_ledger(&ghost, PaymentMethod::Cash, None).await;
        assert!(sync.is_failed());
        assert!(matches!(
            sync,
            LedgerSync::Failed(Error::LedgerSync { order_id, .. }) if order_id == ghost.id
        ));

        let sync = engine.sync_ledger(&order, PaymentMethod::Cash, None).await;
        assert_eq!(sync.bill().map(|b| b.order_id), Some(order.id));
        Ok(())
    }
}
