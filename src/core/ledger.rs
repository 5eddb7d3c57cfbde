//! Billing ledger - keeps the single bill of an order in step with the order's amounts.
//!
//! Each sync runs in its own database transaction, after the order mutation that triggered it
//! has committed. It claims the order row first, so it always copies the order's latest amounts
//! and two syncs for one order cannot both decide to insert. `transactions.order_id` is unique
//! as a structural backstop.

use crate::{
    core::{bill_number::BillNumbering, restaurant::get_tax_rates, store::claim_order},
    entities::{
        Transaction,
        order::{self, PaymentMethod},
        transaction,
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// The bill of an order, if one was ever written.
pub async fn find_transaction_for_order<C>(
    db: &C,
    order_id: i64,
) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::OrderId.eq(order_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates or updates the bill of an order from its current amounts.
///
/// A new bill gets a number from `numbering` and a snapshot of the restaurant's current tax
/// rates. An existing bill has its amounts, method and reference updated in place; its number
/// and rate snapshot never change. A `Due` method keeps the method already on the order.
pub async fn sync_transaction(
    db: &DatabaseConnection,
    numbering: &dyn BillNumbering,
    restaurant_id: i64,
    order_id: i64,
    method: PaymentMethod,
    reference: Option<String>,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;
    let order = claim_order(&txn, restaurant_id, order_id).await?;
    let method = if method.is_settlement() {
        method
    } else {
        order.payment_method
    };

    let bill = match find_transaction_for_order(&txn, order_id).await? {
        Some(existing) => update_bill(&txn, existing, &order, method, reference).await?,
        None => insert_bill(&txn, numbering, &order, method, reference).await?,
    };

    txn.commit().await?;
    Ok(bill)
}

/// Re-copies the order's amounts onto its existing bill. Orders without a bill are left alone.
pub async fn reconcile_transaction(
    db: &DatabaseConnection,
    restaurant_id: i64,
    order_id: i64,
) -> Result<Option<transaction::Model>> {
    let txn = db.begin().await?;
    let order = claim_order(&txn, restaurant_id, order_id).await?;

    let Some(existing) = find_transaction_for_order(&txn, order_id).await? else {
        txn.rollback().await?;
        debug!("Order {} has no bill to reconcile", order_id);
        return Ok(None);
    };
    let method = if order.payment_method.is_settlement() {
        order.payment_method
    } else {
        existing.payment_method
    };
    let bill = update_bill(&txn, existing, &order, method, None).await?;

    txn.commit().await?;
    Ok(Some(bill))
}

async fn update_bill(
    txn: &DatabaseTransaction,
    existing: transaction::Model,
    order: &order::Model,
    method: PaymentMethod,
    reference: Option<String>,
) -> Result<transaction::Model> {
    let now = Utc::now();
    let paid_changed = existing.paid_amount != order.paid_amount;

    let mut active_model: transaction::ActiveModel = existing.into();
    active_model.subtotal = Set(order.subtotal);
    active_model.gst_amount = Set(order.gst_amount);
    active_model.service_amount = Set(order.service_amount);
    active_model.discount_amount = Set(order.discount_amount);
    active_model.grand_total = Set(order.total_amount);
    active_model.paid_amount = Set(order.paid_amount);
    active_model.payment_method = Set(method);
    if reference.is_some() {
        active_model.payment_reference = Set(reference);
    }
    if paid_changed {
        active_model.paid_at = Set(now);
    }
    active_model.updated_at = Set(now);

    let bill = active_model.update(txn).await?;
    debug!("Updated bill {} for order {}", bill.bill_number, order.id);
    Ok(bill)
}

async fn insert_bill(
    txn: &DatabaseTransaction,
    numbering: &dyn BillNumbering,
    order: &order::Model,
    method: PaymentMethod,
    reference: Option<String>,
) -> Result<transaction::Model> {
    let now = Utc::now();
    let rates = get_tax_rates(txn, order.restaurant_id).await?;
    let bill_number = numbering.next_bill_number(txn, order.restaurant_id).await?;

    let bill = transaction::ActiveModel {
        order_id: Set(order.id),
        restaurant_id: Set(order.restaurant_id),
        bill_number: Set(bill_number),
        subtotal: Set(order.subtotal),
        gst_amount: Set(order.gst_amount),
        service_amount: Set(order.service_amount),
        discount_amount: Set(order.discount_amount),
        grand_total: Set(order.total_amount),
        paid_amount: Set(order.paid_amount),
        gst_rate_percent: Set(rates.gst_rate_percent),
        service_rate_percent: Set(rates.service_rate_percent),
        payment_method: Set(method),
        payment_reference: Set(reference),
        paid_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    info!("Created bill {} for order {}", bill.bill_number, order.id);
    Ok(bill)
}
