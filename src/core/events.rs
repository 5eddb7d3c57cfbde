//! Lifecycle notifications for real-time subscribers.
//!
//! Events are emitted after the order write has committed. Delivery is fire-and-forget: a
//! sink never blocks the caller and a delivery problem never fails the mutation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::warn;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A new order was placed
    OrderCreated,
    /// Order fields, payment or totals changed
    OrderUpdated,
    /// Workflow status changed (including cancel and close)
    OrderStatusChanged,
    /// Items were appended to a running order
    OrderItemsAdded,
    /// A table flipped between AVAILABLE and OCCUPIED
    TableStatusChanged,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event type
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Tenant the event belongs to
    pub restaurant_id: i64,
    /// Event body (usually the serialized order or table)
    pub payload: Value,
}

impl OrderEvent {
    /// Builds an event, serializing `payload`. A payload that fails to serialize is sent as
    /// `null` rather than dropping the event.
    pub fn new<T: Serialize>(kind: EventKind, restaurant_id: i64, payload: &T) -> Self {
        Self {
            kind,
            restaurant_id,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }
}

/// Receiver of lifecycle notifications.
pub trait EventSink: Send + Sync {
    /// Hands an event over for delivery. Must not block.
    fn emit(&self, event: OrderEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: OrderEvent) {}
}

/// Forwards events into a bounded tokio channel; drops and warns when full or closed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<OrderEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver a subscriber drains.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OrderEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: OrderEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping order event: {}", e);
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far.
    #[must_use]
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kinds emitted so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: OrderEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
