//! Unified error type for the order ledger.
//!
//! Business-rule violations (`InvalidTransition`, `Validation`) carry enough context for a
//! caller to act on them. Store failures surface as `Database` and abort the mutation that
//! raised them. `LedgerSync` is only ever reported inside an operation outcome, never as the
//! `Err` of an order mutation that already committed.

use crate::entities::order::{OrderStatus, PaymentStatus};
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An id did not resolve under the given restaurant scope.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// The id that failed to resolve
        id: i64,
    },

    /// The order's current state forbids the requested operation.
    #[error("order {order_id}: {violation}")]
    InvalidTransition {
        /// Order the operation targeted
        order_id: i64,
        /// Which lifecycle rule was violated
        violation: TransitionViolation,
    },

    /// Malformed input.
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable description of the bad input
        message: String,
    },

    /// The billing record could not be created or updated.
    #[error("Ledger sync failed for order {order_id}: {message}")]
    LedgerSync {
        /// Order whose bill could not be synced
        order_id: i64,
        /// Underlying failure
        message: String,
    },

    /// No unused bill number could be generated.
    #[error("No free bill number after {attempts} attempts")]
    BillNumberExhausted {
        /// Attempts made
        attempts: u32,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Store failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The specific lifecycle rule an operation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionViolation {
    /// Items cannot be added to a closed order.
    #[error("order is closed")]
    OrderClosed,
    /// The order was already closed.
    #[error("order is already closed")]
    AlreadyClosed,
    /// Cancelled orders are terminal.
    #[error("order is cancelled")]
    Cancelled,
    /// Closing requires the order to have been served.
    #[error("must be SERVED (currently {current})")]
    NotServed {
        /// Status the order was in
        current: OrderStatus,
    },
    /// Closing requires the order to be fully paid.
    #[error("must be PAID (payment currently {current})")]
    NotPaid {
        /// Payment status the order was in
        current: PaymentStatus,
    },
    /// Items can only be removed before preparation starts.
    #[error("must be PENDING (currently {current})")]
    NotPending {
        /// Status the order was in
        current: OrderStatus,
    },
    /// The workflow does not allow moving between these statuses.
    #[error("cannot move from {from} to {to}")]
    IllegalStatusChange {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },
    /// The resulting status/payment/closed combination is not on the allow-list.
    #[error("illegal combination: status {status}, payment {payment_status}, closed {closed}")]
    IllegalCombination {
        /// Workflow status
        status: OrderStatus,
        /// Payment status
        payment_status: PaymentStatus,
        /// Closed flag
        closed: bool,
    },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::InvalidTransition`].
    #[must_use]
    pub const fn transition(order_id: i64, violation: TransitionViolation) -> Self {
        Self::InvalidTransition {
            order_id,
            violation,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
