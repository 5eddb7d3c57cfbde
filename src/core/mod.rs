//! Core business logic - framework-agnostic order, payment, table and billing operations.
//!
//! [`OrderEngine`] is the entry point; the other modules hold the pure rules (pricing, tax,
//! lifecycle) and the store helpers the engine's operations are built from.

/// Bill-number strategies
pub mod bill_number;
/// Batch loading of menu rows for a set of line requests
pub mod catalog;
/// The engine type, shared outcome types and post-commit follow-ups
pub mod engine;
/// Lifecycle notifications and sinks
pub mod events;
/// One bill per order, kept in step with the order
pub mod ledger;
/// Status, payment and closed-flag rules
pub mod lifecycle;
/// Rounding and payment status derivation
pub mod money;
/// Place, append, remove, edit, advance, cancel and close
pub mod order;
/// Payment state changes
pub mod payment;
/// Line pricing and snapshots
pub mod pricing;
/// Restaurant rates and seeding
pub mod restaurant;
/// Order row access shared by the operations
pub mod store;
/// Table occupancy
pub mod table;
/// GST, service charge and discounts
pub mod tax;

pub use engine::{LedgerSync, OrderDetails, OrderEngine, OrderOutcome};
pub use order::{AppendItemsRequest, OrderFieldsUpdate, PlaceOrderRequest};
pub use payment::PaymentUpdate;
pub use pricing::LineRequest;
