//! Order snapshot - materialized state computed from the event stream
//!
//! Also home of [`OrderStatus`] and its transition table. The table is the
//! single source of truth for which status edges are legal; the server
//! enforces it and clients may use it to grey out buttons.

use super::types::{
    DeliveryDetails, OrderItemSnapshot, OrderType, PaymentMethod, PaymentStatus, order_total,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    New,
    Cooking,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Legal targets from this status for the given order type
    pub fn next_statuses(self, order_type: OrderType) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match (self, order_type) {
            (New, _) => &[Cooking, Cancelled],
            (Cooking, _) => &[Ready, New],
            (Ready, OrderType::DineIn) => &[Delivered, Cooking],
            (Ready, OrderType::Delivery) => &[OutForDelivery, Cooking],
            (OutForDelivery, _) => &[Delivered, Ready],
            // Undo only: completion is reversible for vendor error correction
            (Delivered, OrderType::DineIn) => &[Ready],
            (Delivered, OrderType::Delivery) => &[OutForDelivery],
            (Cancelled, _) => &[],
        }
    }

    /// Whether `self -> to` is an edge of the transition table
    pub fn can_transition_to(self, to: OrderStatus, order_type: OrderType) -> bool {
        self.next_statuses(order_type).contains(&to)
    }

    /// Whether the order is still in the queue (holds its pickup token)
    pub fn is_open(self) -> bool {
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Cancelled is the only irreversible state
    pub fn is_final(self) -> bool {
        self == OrderStatus::Cancelled
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Cooking => write!(f, "COOKING"),
            OrderStatus::Ready => write!(f, "READY"),
            OrderStatus::OutForDelivery => write!(f, "OUT_FOR_DELIVERY"),
            OrderStatus::Delivered => write!(f, "DELIVERED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Order snapshot - computed from event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OrderSnapshot {
    /// Order ID (assigned by server)
    pub order_id: String,
    /// Pickup token, e.g. "R-042"
    pub token: String,
    /// Customer ID (snapshot at creation)
    pub customer_id: String,
    /// Customer name (snapshot at creation)
    pub customer_name: String,
    /// Items copied from the menu at order time
    pub items: Vec<OrderItemSnapshot>,
    /// Σ unit_price × quantity, fixed at creation
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_details: Option<DeliveryDetails>,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Last update timestamp (Unix millis, never decreases)
    pub updated_at: i64,
    /// Optimistic concurrency version (0 at creation, +1 per mutation)
    pub version: u64,
    /// Last applied event sequence
    pub last_sequence: u64,
}

impl OrderSnapshot {
    /// Create an empty snapshot (filled in by the OrderCreated applier)
    pub fn new(order_id: String) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    /// Check if order still holds a queue slot
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Recompute the total from the item snapshots
    pub fn computed_total(&self) -> Option<Decimal> {
        order_total(&self.items)
    }
}
