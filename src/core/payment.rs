//! Payment updates and direct ledger access.

use crate::{
    core::{
        engine::{OrderEngine, OrderOutcome, load_details},
        events::EventKind,
        ledger,
        money::{MONEY_TOLERANCE, derive_payment_status, round_money},
        store::{claim_order, save_order},
    },
    entities::{
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        transaction,
    },
    errors::{Error, Result, TransitionViolation},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A change of an order's payment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    /// Target payment status
    pub status: PaymentStatus,
    /// How the money was collected; falls back to the method already on the order
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    /// Amount collected so far, required for `PartiallyPaid`
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Gateway or terminal reference copied onto the bill
    #[serde(default)]
    pub reference: Option<String>,
}

impl PaymentUpdate {
    /// Full settlement with `method`.
    #[must_use]
    pub const fn paid(method: PaymentMethod) -> Self {
        Self {
            status: PaymentStatus::Paid,
            method: Some(method),
            amount: None,
            reference: None,
        }
    }

    /// Partial settlement of `amount` with `method`.
    #[must_use]
    pub const fn partial(method: PaymentMethod, amount: Decimal) -> Self {
        Self {
            status: PaymentStatus::PartiallyPaid,
            method: Some(method),
            amount: Some(amount),
            reference: None,
        }
    }

    /// Resets the order to nothing paid.
    #[must_use]
    pub const fn due() -> Self {
        Self {
            status: PaymentStatus::Due,
            method: None,
            amount: None,
            reference: None,
        }
    }
}

/// The `paid_amount` a requested payment status stands for.
///
/// `Paid` means the whole total; `PartiallyPaid` needs an explicit amount strictly between
/// zero and the total. Anything but `Due` needs a real collection method.
pub(crate) fn requested_paid(
    status: PaymentStatus,
    method: PaymentMethod,
    amount: Option<Decimal>,
    total: Decimal,
) -> Result<Decimal> {
    if status != PaymentStatus::Due && !method.is_settlement() {
        return Err(Error::validation(format!(
            "payment status {status} needs a payment method other than DUE"
        )));
    }
    match status {
        PaymentStatus::Due => Ok(Decimal::ZERO),
        PaymentStatus::Paid => Ok(total),
        PaymentStatus::PartiallyPaid => {
            let amount = round_money(amount.ok_or_else(|| {
                Error::validation("a partial payment needs an amount")
            })?);
            if amount <= Decimal::ZERO || amount >= total - MONEY_TOLERANCE {
                return Err(Error::validation(format!(
                    "partial payment must be between 0 and {total}, got {amount}"
                )));
            }
            Ok(amount)
        }
    }
}

/// Payment status after a requested payment. A settled zero total counts as paid.
pub(crate) fn settled_status(requested: PaymentStatus, paid: Decimal, total: Decimal) -> PaymentStatus {
    if requested == PaymentStatus::Paid && total.is_zero() {
        PaymentStatus::Paid
    } else {
        derive_payment_status(paid, total)
    }
}

/// Keeps `closed_at` in step with settlement on an open order: stamped when it becomes fully
/// paid, cleared when it falls back. Closed and cancelled orders keep theirs.
pub(crate) fn stamp_settlement(order: &mut order::Model, now: DateTime<Utc>) {
    if order.closed || order.status == OrderStatus::Cancelled {
        return;
    }
    order.closed_at = if order.payment_status == PaymentStatus::Paid {
        order.closed_at.or(Some(now))
    } else {
        None
    };
}

impl OrderEngine {
    /// Records a payment state change and writes the bill for it.
    ///
    /// `Paid` sets `paid_amount` to the total; `Due` resets it to zero. A closed order only
    /// accepts `Paid` again, which re-syncs its bill without touching the order.
    #[instrument(skip(self, update), fields(status = %update.status))]
    pub async fn update_payment_status(
        &self,
        restaurant_id: i64,
        order_id: i64,
        update: PaymentUpdate,
    ) -> Result<OrderOutcome> {
        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;

        if order.status == OrderStatus::Cancelled {
            return Err(Error::transition(order.id, TransitionViolation::Cancelled));
        }
        let method = update
            .method
            .filter(|m| m.is_settlement())
            .unwrap_or(order.payment_method);

        if order.closed {
            if update.status != PaymentStatus::Paid {
                return Err(Error::transition(order.id, TransitionViolation::OrderClosed));
            }
            txn.rollback().await?;
            let ledger = self.sync_ledger(&order, method, update.reference).await;
            let details = load_details(&self.db, order).await?;
            return Ok(OrderOutcome {
                details,
                merged: false,
                ledger,
            });
        }

        let paid = requested_paid(update.status, method, update.amount, order.total_amount)?;
        order.paid_amount = paid;
        order.payment_status = settled_status(update.status, paid, order.total_amount);
        order.payment_method = if update.status == PaymentStatus::Due {
            PaymentMethod::Due
        } else {
            method
        };
        stamp_settlement(&mut order, Utc::now());

        let order = save_order(&txn, order).await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!(
            "Order {} payment {} ({} of {})",
            details.order.id,
            details.order.payment_status,
            details.order.paid_amount,
            details.order.total_amount
        );

        self.emit(EventKind::OrderUpdated, restaurant_id, &details);
        let ledger = if update.status == PaymentStatus::Due {
            self.reconcile_ledger(&details.order).await
        } else {
            self.sync_ledger(&details.order, method, update.reference).await
        };
        if details.order.payment_status == PaymentStatus::Paid {
            self.refresh_table(&details.order).await;
        }

        Ok(OrderOutcome {
            details,
            merged: false,
            ledger,
        })
    }

    /// Creates or updates the order's bill from its current amounts.
    ///
    /// Unlike the follow-up sync after a mutation, a failure here is returned as the error.
    #[instrument(skip(self, reference))]
    pub async fn sync_transaction(
        &self,
        restaurant_id: i64,
        order_id: i64,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> Result<transaction::Model> {
        ledger::sync_transaction(
            &self.db,
            self.numbering.as_ref(),
            restaurant_id,
            order_id,
            method,
            reference,
        )
        .await
    }

    /// Re-copies the order's amounts onto its bill; `None` when the order has no bill.
    #[instrument(skip(self))]
    pub async fn reconcile_transaction(
        &self,
        restaurant_id: i64,
        order_id: i64,
    ) -> Result<Option<transaction::Model>> {
        ledger::reconcile_transaction(&self.db, restaurant_id, order_id).await
    }
}
