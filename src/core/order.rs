//! Order aggregate operations: place, append, remove, edit, advance, cancel and close.
//!
//! Every operation here runs inside one database transaction that starts by claiming the
//! order row (or the table row, for placement). Totals are always recomputed from the line
//! items stored in the database, never from values carried over from an earlier read.

use crate::{
    config::RemovalPaymentPolicy,
    core::{
        engine::{LedgerSync, OrderDetails, OrderEngine, OrderOutcome, load_details},
        events::EventKind,
        lifecycle::{
            check_combination, ensure_active, ensure_can_append, ensure_can_close,
            ensure_can_remove_items, ensure_status_change, status_after_append,
        },
        money::derive_payment_status,
        payment::{requested_paid, settled_status, stamp_settlement},
        pricing::{LineRequest, lines_subtotal, resolve_lines, validate_lines},
        restaurant::get_tax_rates,
        store::{claim_order, items_subtotal, load_items, save_order},
        table::{claim_table, open_orders_for_table},
        tax::{Charges, compute_charges, service_charge, tax_inclusive_amount, waiver_in_effect},
    },
    entities::{
        OrderItem,
        order::{self, OrderStatus, OrderType, PaymentMethod, PaymentStatus},
        order_item,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A request to start a new order, or to add to a table's running order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Table to seat the order at; ignored unless the order is dine-in
    #[serde(default)]
    pub table_id: Option<i64>,
    /// Dine-in, takeaway or delivery
    pub order_type: OrderType,
    /// Requested lines; at least one
    pub items: Vec<LineRequest>,
    /// How the guest paid, `Due` when nothing was collected
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Payment state the order starts in
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Amount collected, for a partially paid start
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    /// Reference copied onto the bill
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Flat discount; clamped to the gross amount
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    /// Bill this order without a service charge
    #[serde(default)]
    pub waive_service_charge: bool,
    /// Name the guest gave
    #[serde(default)]
    pub guest_name: Option<String>,
    /// Free-form order notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Staff member taking the order
    #[serde(default)]
    pub placed_by: Option<String>,
}

impl PlaceOrderRequest {
    /// An unpaid order of the given type.
    #[must_use]
    pub fn new(order_type: OrderType, table_id: Option<i64>, items: Vec<LineRequest>) -> Self {
        Self {
            table_id,
            order_type,
            items,
            payment_method: PaymentMethod::Due,
            payment_status: PaymentStatus::Due,
            paid_amount: None,
            payment_reference: None,
            discount_amount: None,
            waive_service_charge: false,
            guest_name: None,
            notes: None,
            placed_by: None,
        }
    }

    /// An unpaid dine-in order at `table_id`.
    #[must_use]
    pub fn dine_in(table_id: i64, items: Vec<LineRequest>) -> Self {
        Self::new(OrderType::DineIn, Some(table_id), items)
    }

    /// An unpaid takeaway order.
    #[must_use]
    pub fn takeaway(items: Vec<LineRequest>) -> Self {
        Self::new(OrderType::Takeaway, None, items)
    }

    /// Marks the request as paid in full with `method`.
    #[must_use]
    pub const fn paid_with(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self.payment_status = PaymentStatus::Paid;
        self
    }
}

/// Lines to add to a running order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendItemsRequest {
    /// Requested lines; at least one
    pub items: Vec<LineRequest>,
    /// Method the new lines were paid with
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// `Paid` when the new lines were paid on the spot
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// Reference copied onto the bill
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Waive the service charge from now on
    #[serde(default)]
    pub waive_service_charge: bool,
}

impl AppendItemsRequest {
    /// Unpaid lines.
    #[must_use]
    pub const fn new(items: Vec<LineRequest>) -> Self {
        Self {
            items,
            payment_method: None,
            payment_status: None,
            payment_reference: None,
            waive_service_charge: false,
        }
    }

    /// Marks the new lines as paid with `method`.
    #[must_use]
    pub const fn paid_with(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self.payment_status = Some(PaymentStatus::Paid);
        self
    }
}

/// Editable order fields. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFieldsUpdate {
    /// New flat discount
    pub discount_amount: Option<Decimal>,
    /// New guest name
    pub guest_name: Option<String>,
    /// New notes
    pub notes: Option<String>,
    /// Turn the service charge waiver on or off
    pub waive_service_charge: Option<bool>,
}

/// What an append did, before the follow-ups run.
struct Appended {
    details: OrderDetails,
    previous_status: OrderStatus,
    payment: Option<(PaymentMethod, Option<String>)>,
}

/// Which method, if any, pays for appended lines.
fn append_payment(request: &AppendItemsRequest) -> Result<Option<PaymentMethod>> {
    match request.payment_status {
        None | Some(PaymentStatus::Due) => Ok(None),
        Some(PaymentStatus::Paid) => {
            let method = request.payment_method.unwrap_or_default();
            if method.is_settlement() {
                Ok(Some(method))
            } else {
                Err(Error::validation(
                    "paid items need a payment method other than DUE",
                ))
            }
        }
        Some(PaymentStatus::PartiallyPaid) => Err(Error::validation(
            "appended items are either paid in full or due; record partial payments separately",
        )),
    }
}

/// Adds lines to a claimed order and recomputes it, within the caller's transaction.
async fn append_in_txn(
    txn: &DatabaseTransaction,
    mut order: order::Model,
    request: AppendItemsRequest,
) -> Result<Appended> {
    ensure_can_append(&order)?;
    validate_lines(&request.items)?;
    let paying = append_payment(&request)?;

    let priced = resolve_lines(txn, order.restaurant_id, &request.items).await?;
    let added_subtotal = lines_subtotal(&priced);
    let now = Utc::now();
    OrderItem::insert_many(priced.into_iter().map(|l| l.into_active_model(order.id, now)))
        .exec(txn)
        .await?;

    let rates = get_tax_rates(txn, order.restaurant_id).await?;
    let waived = request.waive_service_charge || waiver_in_effect(&order, rates);
    let items = load_items(txn, order.id).await?;
    let charges = compute_charges(
        items_subtotal(&items),
        rates,
        order.order_type,
        order.discount_amount,
        waived,
    );
    let increment = if paying.is_some() {
        tax_inclusive_amount(added_subtotal, rates, order.order_type, waived)
    } else {
        Decimal::ZERO
    };

    let previous_status = order.status;
    charges.apply_to(&mut order);
    order.service_charge_waived = waived;
    order.paid_amount = (order.paid_amount + increment).min(order.total_amount);
    order.payment_status = derive_payment_status(order.paid_amount, order.total_amount);
    order.status = status_after_append(previous_status);
    if let Some(method) = paying {
        order.payment_method = method;
    }
    stamp_settlement(&mut order, now);

    let order = save_order(txn, order).await?;
    debug!(
        "Order {} now {} / {} after adding {} lines",
        order.id,
        order.subtotal,
        order.total_amount,
        request.items.len()
    );
    Ok(Appended {
        details: OrderDetails { order, items },
        previous_status,
        payment: paying.map(|method| (method, request.payment_reference)),
    })
}

impl OrderEngine {
    /// Places an order.
    ///
    /// A dine-in request for a table that already has an open order is folded into that order
    /// as an append; the outcome reports `merged`. Otherwise a new PENDING order is written
    /// with its priced lines, the table is marked occupied, and a bill is written when the
    /// order starts paid.
    #[instrument(skip(self, request), fields(order_type = ?request.order_type, table_id = ?request.table_id))]
    pub async fn place_order(
        &self,
        restaurant_id: i64,
        request: PlaceOrderRequest,
    ) -> Result<OrderOutcome> {
        validate_lines(&request.items)?;
        if request.discount_amount.is_some_and(|d| d < Decimal::ZERO) {
            return Err(Error::validation("discount cannot be negative"));
        }
        let table_id = match request.order_type {
            OrderType::DineIn => request.table_id,
            OrderType::Takeaway | OrderType::Delivery => None,
        };

        let txn = self.db.begin().await?;

        if let Some(table_id) = table_id {
            claim_table(&txn, restaurant_id, table_id).await?;
            let running = open_orders_for_table(restaurant_id, table_id)
                .order_by_desc(order::Column::CreatedAt)
                .one(&txn)
                .await?;
            if let Some(running) = running {
                info!(
                    "Table {} already has open order {}; adding to it",
                    table_id, running.id
                );
                let append = AppendItemsRequest {
                    items: request.items,
                    payment_method: Some(request.payment_method),
                    payment_status: Some(request.payment_status),
                    payment_reference: request.payment_reference,
                    waive_service_charge: request.waive_service_charge,
                };
                let appended = append_in_txn(&txn, running, append).await?;
                txn.commit().await?;
                return Ok(self.after_append(appended, true).await);
            }
        }

        let priced = resolve_lines(&txn, restaurant_id, &request.items).await?;
        let rates = get_tax_rates(&txn, restaurant_id).await?;
        let charges = compute_charges(
            lines_subtotal(&priced),
            rates,
            request.order_type,
            request.discount_amount.unwrap_or_default(),
            request.waive_service_charge,
        );
        let paid = requested_paid(
            request.payment_status,
            request.payment_method,
            request.paid_amount,
            charges.total,
        )?;
        let payment_status = settled_status(request.payment_status, paid, charges.total);

        let now = Utc::now();
        let order = order::ActiveModel {
            restaurant_id: Set(restaurant_id),
            table_id: Set(table_id),
            order_type: Set(request.order_type),
            status: Set(OrderStatus::Pending),
            payment_status: Set(payment_status),
            payment_method: Set(request.payment_method),
            subtotal: Set(charges.subtotal),
            gst_amount: Set(charges.gst),
            service_amount: Set(charges.service),
            discount_amount: Set(charges.discount),
            total_amount: Set(charges.total),
            paid_amount: Set(paid),
            service_charge_waived: Set(request.waive_service_charge),
            closed: Set(false),
            cancel_reason: Set(None),
            guest_name: Set(request.guest_name),
            notes: Set(request.notes),
            placed_by: Set(request.placed_by),
            created_at: Set(now),
            updated_at: Set(now),
            closed_at: Set((payment_status == PaymentStatus::Paid).then_some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        check_combination(&order)?;

        OrderItem::insert_many(priced.into_iter().map(|l| l.into_active_model(order.id, now)))
            .exec(&txn)
            .await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!(
            "Placed order {} ({} lines, total {})",
            details.order.id,
            details.items.len(),
            details.order.total_amount
        );

        self.occupy_table(&details.order).await;
        self.emit(EventKind::OrderCreated, restaurant_id, &details);
        let ledger = if request.payment_status == PaymentStatus::Due {
            LedgerSync::NotRequired
        } else {
            self.sync_ledger(&details.order, request.payment_method, request.payment_reference)
                .await
        };

        Ok(OrderOutcome {
            details,
            merged: false,
            ledger,
        })
    }

    /// Adds lines to an open order.
    ///
    /// Totals are recomputed over all lines, keeping the discount and any service waiver.
    /// When the new lines are marked paid with a real method, their tax-inclusive amount is
    /// added to `paid_amount` and the bill is updated. A READY, SERVED or PAID order goes back
    /// to PENDING.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn append_items(
        &self,
        restaurant_id: i64,
        order_id: i64,
        request: AppendItemsRequest,
    ) -> Result<OrderOutcome> {
        let txn = self.db.begin().await?;
        let order = claim_order(&txn, restaurant_id, order_id).await?;
        let appended = append_in_txn(&txn, order, request).await?;
        txn.commit().await?;
        Ok(self.after_append(appended, false).await)
    }

    async fn after_append(&self, appended: Appended, merged: bool) -> OrderOutcome {
        let Appended {
            details,
            previous_status,
            payment,
        } = appended;
        let restaurant_id = details.order.restaurant_id;

        if merged {
            self.occupy_table(&details.order).await;
        }
        self.emit(EventKind::OrderItemsAdded, restaurant_id, &details);
        if details.order.status != previous_status {
            info!(
                "Order {} back to {} from {}",
                details.order.id, details.order.status, previous_status
            );
            self.emit(EventKind::OrderStatusChanged, restaurant_id, &details);
        }
        let ledger = match payment {
            Some((method, reference)) => self.sync_ledger(&details.order, method, reference).await,
            None => LedgerSync::NotRequired,
        };

        OrderOutcome {
            details,
            merged,
            ledger,
        }
    }

    /// Removes one line from a PENDING order and recomputes its totals.
    ///
    /// Whether `paid_amount` and `payment_status` follow the new total depends on the
    /// configured [`RemovalPaymentPolicy`].
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        restaurant_id: i64,
        order_id: i64,
        item_id: i64,
    ) -> Result<OrderOutcome> {
        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;
        ensure_can_remove_items(&order)?;

        let item = OrderItem::find_by_id(item_id)
            .filter(order_item::Column::OrderId.eq(order.id))
            .one(&txn)
            .await?
            .ok_or(Error::NotFound {
                entity: "order item",
                id: item_id,
            })?;
        item.delete(&txn).await?;

        let rates = get_tax_rates(&txn, restaurant_id).await?;
        let waived = waiver_in_effect(&order, rates);
        let items = load_items(&txn, order.id).await?;
        compute_charges(
            items_subtotal(&items),
            rates,
            order.order_type,
            order.discount_amount,
            waived,
        )
        .apply_to(&mut order);
        order.service_charge_waived = waived;

        let policy = self.settings.removal_payment_policy;
        if policy == RemovalPaymentPolicy::Recompute {
            order.paid_amount = order.paid_amount.min(order.total_amount);
            order.payment_status = derive_payment_status(order.paid_amount, order.total_amount);
            stamp_settlement(&mut order, Utc::now());
        }

        let order = save_order(&txn, order).await?;
        txn.commit().await?;
        info!(
            "Removed item {} from order {}; total now {}",
            item_id, order.id, order.total_amount
        );

        let details = OrderDetails { order, items };
        self.emit(EventKind::OrderUpdated, restaurant_id, &details);
        let ledger = match policy {
            RemovalPaymentPolicy::Recompute => self.reconcile_ledger(&details.order).await,
            RemovalPaymentPolicy::Preserve => LedgerSync::NotRequired,
        };

        Ok(OrderOutcome {
            details,
            merged: false,
            ledger,
        })
    }

    /// Edits discount, waiver, guest name and notes of an active order.
    ///
    /// A discount or waiver change recomputes the total from the stored subtotal, clamps
    /// `paid_amount` to it, re-derives the payment status, and re-syncs an existing bill.
    #[instrument(skip(self, update))]
    pub async fn update_order_fields(
        &self,
        restaurant_id: i64,
        order_id: i64,
        update: OrderFieldsUpdate,
    ) -> Result<OrderOutcome> {
        if update.discount_amount.is_some_and(|d| d < Decimal::ZERO) {
            return Err(Error::validation("discount cannot be negative"));
        }

        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;
        ensure_active(&order)?;

        let waiver_changed = update
            .waive_service_charge
            .is_some_and(|w| w != order.service_charge_waived);
        let discount = update.discount_amount.unwrap_or(order.discount_amount);
        let amounts_changed = waiver_changed || discount != order.discount_amount;

        if amounts_changed {
            let charges = if let Some(waived) = update.waive_service_charge.filter(|_| waiver_changed)
            {
                let rates = get_tax_rates(&txn, restaurant_id).await?;
                order.service_charge_waived = waived;
                Charges {
                    service: service_charge(order.subtotal, rates, order.order_type, waived),
                    ..Charges::of_order(&order)
                }
                .with_discount(discount)
            } else {
                Charges::of_order(&order).with_discount(discount)
            };
            charges.apply_to(&mut order);
            order.paid_amount = order.paid_amount.min(order.total_amount);
            order.payment_status = derive_payment_status(order.paid_amount, order.total_amount);
            stamp_settlement(&mut order, Utc::now());
        }
        if let Some(guest_name) = update.guest_name {
            order.guest_name = Some(guest_name);
        }
        if let Some(notes) = update.notes {
            order.notes = Some(notes);
        }

        let order = save_order(&txn, order).await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!("Updated fields of order {}", details.order.id);

        self.emit(EventKind::OrderUpdated, restaurant_id, &details);
        let ledger = if amounts_changed {
            self.reconcile_ledger(&details.order).await
        } else {
            LedgerSync::NotRequired
        };

        Ok(OrderOutcome {
            details,
            merged: false,
            ledger,
        })
    }

    /// Moves an order forward along PENDING → PREPARING → READY → SERVED → PAID.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        restaurant_id: i64,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<OrderDetails> {
        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;
        ensure_status_change(&order, status)?;

        let previous = order.status;
        order.status = status;
        let order = save_order(&txn, order).await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!("Order {} {} -> {}", order_id, previous, status);

        self.emit(EventKind::OrderStatusChanged, restaurant_id, &details);
        Ok(details)
    }

    /// Cancels an open order, zeroing what was paid, and frees its table if nothing else
    /// holds it.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        restaurant_id: i64,
        order_id: i64,
        reason: &str,
    ) -> Result<OrderDetails> {
        let reason = reason.trim();
        let min_len = self.settings.cancel_reason_min_len;
        if reason.chars().count() < min_len {
            return Err(Error::validation(format!(
                "cancel reason must be at least {min_len} characters"
            )));
        }

        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;
        ensure_active(&order)?;

        order.status = OrderStatus::Cancelled;
        order.payment_status = PaymentStatus::Due;
        order.paid_amount = Decimal::ZERO;
        order.cancel_reason = Some(reason.to_string());
        order.closed_at = Some(Utc::now());
        let order = save_order(&txn, order).await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!("Cancelled order {}: {}", order_id, reason);

        self.emit(EventKind::OrderStatusChanged, restaurant_id, &details);
        self.refresh_table(&details.order).await;
        Ok(details)
    }

    /// Closes a served, fully paid order and frees its table if nothing else holds it.
    #[instrument(skip(self))]
    pub async fn close(&self, restaurant_id: i64, order_id: i64) -> Result<OrderDetails> {
        let txn = self.db.begin().await?;
        let mut order = claim_order(&txn, restaurant_id, order_id).await?;
        ensure_can_close(&order)?;

        order.closed = true;
        order.closed_at = order.closed_at.or_else(|| Some(Utc::now()));
        let order = save_order(&txn, order).await?;
        let details = load_details(&txn, order).await?;
        txn.commit().await?;
        info!("Closed order {}", order_id);

        self.emit(EventKind::OrderStatusChanged, restaurant_id, &details);
        self.refresh_table(&details.order).await;
        Ok(details)
    }
}
