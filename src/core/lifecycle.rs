//! Order lifecycle rules.
//!
//! Status, payment status and the closed flag are independent columns, but only some
//! combinations make sense. [`check_combination`] is the allow-list every order write goes
//! through; the other functions decide whether a specific operation may start.

use crate::{
    entities::order::{self, OrderStatus, PaymentStatus},
    errors::{Error, Result, TransitionViolation},
};

/// Rejects status/payment/closed combinations that are not on the allow-list:
///
/// - a closed order is SERVED or PAID, and fully paid
/// - a cancelled order is not closed and owes nothing
/// - PAID status implies PAID payment status
pub fn check_combination(order: &order::Model) -> Result<()> {
    let ok = match (order.status, order.closed) {
        (OrderStatus::Cancelled, closed) => !closed && order.payment_status == PaymentStatus::Due,
        (OrderStatus::Served, true) => order.payment_status == PaymentStatus::Paid,
        (OrderStatus::Paid, _) => order.payment_status == PaymentStatus::Paid,
        (_, true) => false,
        (_, false) => true,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::transition(
            order.id,
            TransitionViolation::IllegalCombination {
                status: order.status,
                payment_status: order.payment_status,
                closed: order.closed,
            },
        ))
    }
}

/// An order that is neither closed nor cancelled.
pub fn ensure_active(order: &order::Model) -> Result<()> {
    if order.closed {
        return Err(Error::transition(order.id, TransitionViolation::OrderClosed));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(Error::transition(order.id, TransitionViolation::Cancelled));
    }
    Ok(())
}

/// Items can be added while the order is open.
pub fn ensure_can_append(order: &order::Model) -> Result<()> {
    ensure_active(order)
}

/// Items can be removed only before the kitchen starts.
pub fn ensure_can_remove_items(order: &order::Model) -> Result<()> {
    ensure_active(order)?;
    if order.status != OrderStatus::Pending {
        return Err(Error::transition(
            order.id,
            TransitionViolation::NotPending {
                current: order.status,
            },
        ));
    }
    Ok(())
}

/// Closing requires a served (or later) and fully paid order.
pub fn ensure_can_close(order: &order::Model) -> Result<()> {
    if order.closed {
        return Err(Error::transition(order.id, TransitionViolation::AlreadyClosed));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(Error::transition(order.id, TransitionViolation::Cancelled));
    }
    if !matches!(order.status, OrderStatus::Served | OrderStatus::Paid) {
        return Err(Error::transition(
            order.id,
            TransitionViolation::NotServed {
                current: order.status,
            },
        ));
    }
    if order.payment_status != PaymentStatus::Paid {
        return Err(Error::transition(
            order.id,
            TransitionViolation::NotPaid {
                current: order.payment_status,
            },
        ));
    }
    Ok(())
}

/// Workflow moves are forward-only; cancelling goes through its own operation.
pub fn ensure_status_change(order: &order::Model, to: OrderStatus) -> Result<()> {
    ensure_active(order)?;
    let illegal = Error::transition(
        order.id,
        TransitionViolation::IllegalStatusChange {
            from: order.status,
            to,
        },
    );
    match (order.status.rank(), to.rank()) {
        (Some(from), Some(target)) if target > from => {}
        _ => return Err(illegal),
    }
    if to == OrderStatus::Paid && order.payment_status != PaymentStatus::Paid {
        return Err(Error::transition(
            order.id,
            TransitionViolation::NotPaid {
                current: order.payment_status,
            },
        ));
    }
    Ok(())
}

/// Status an order falls back to when new items arrive.
#[must_use]
pub const fn status_after_append(current: OrderStatus) -> OrderStatus {
    match current {
        OrderStatus::Ready | OrderStatus::Served | OrderStatus::Paid => OrderStatus::Pending,
        other => other,
    }
}
