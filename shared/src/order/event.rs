//! Order events - immutable facts recorded after command processing

use super::snapshot::{OrderSnapshot, OrderStatus};
use super::types::{
    Actor, DeliveryDetails, OrderItemSnapshot, OrderType, PaymentMethod, PaymentStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Order version after this event was applied
    pub version: u64,
    /// Server timestamp (Unix milliseconds) - AUTHORITATIVE for state evolution
    pub timestamp: i64,
    /// Who triggered this event
    pub actor: Actor,
    /// Event type
    pub event_type: OrderEventType,
    /// Event payload
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderCreated,
    OrderStatusChanged,
    OrderPaymentChanged,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::OrderStatusChanged => write!(f, "ORDER_STATUS_CHANGED"),
            OrderEventType::OrderPaymentChanged => write!(f, "ORDER_PAYMENT_CHANGED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    OrderCreated {
        token: String,
        customer_id: String,
        customer_name: String,
        items: Vec<OrderItemSnapshot>,
        total_amount: Decimal,
        payment_method: PaymentMethod,
        order_type: OrderType,
        #[serde(skip_serializing_if = "Option::is_none")]
        delivery_details: Option<DeliveryDetails>,
    },

    OrderStatusChanged {
        from: OrderStatus,
        to: OrderStatus,
        /// Set when the pickup token changed (re-opened order whose token was taken)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    OrderPaymentChanged {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

impl OrderEvent {
    /// Create a new event
    pub fn new(
        sequence: u64,
        order_id: String,
        version: u64,
        timestamp: i64,
        actor: Actor,
        event_type: OrderEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            version,
            timestamp,
            actor,
            event_type,
            payload,
        }
    }
}

/// What the change feed carries: the event plus the materialized order
///
/// Observers never need to fold deltas themselves; `order` is the whole
/// committed record at `event.version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderNotification {
    pub event: OrderEvent,
    pub order: OrderSnapshot,
}

impl OrderNotification {
    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    pub fn version(&self) -> u64 {
        self.order.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tagging() {
        let payload = EventPayload::OrderStatusChanged {
            from: OrderStatus::New,
            to: OrderStatus::Cooking,
            token: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "ORDER_STATUS_CHANGED");
        assert_eq!(json["from"], "NEW");
        assert_eq!(json["to"], "COOKING");
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_event_json_roundtrip() {
        let event = OrderEvent::new(
            7,
            "order-1".to_string(),
            2,
            1_700_000_000_000,
            Actor::Vendor,
            OrderEventType::OrderPaymentChanged,
            EventPayload::OrderPaymentChanged {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Paid,
            },
        );
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: OrderEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}
