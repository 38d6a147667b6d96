//! Change Bus - 已提交订单变更的广播
//!
//! ```text
//! OrdersManager (commit) ──► ChangeBus (broadcast)
//!                               ├── ScopedReceiver(All)          ──► vendor dashboard
//!                               └── ScopedReceiver(Order{id})    ──► customer tracking
//! ```
//!
//! Publishing never blocks: a slow receiver falls behind and sees
//! `Lagged` on its next receive instead of holding up the writer.
//! Notifications are wrapped in `Arc` so fan-out does not clone orders.

use std::sync::Arc;

use shared::order::{OrderNotification, SubscriptionScope};
use thiserror::Error;
use tokio::sync::broadcast;

/// Default channel capacity (overridable via EVENT_CHANNEL_CAPACITY)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusRecvError {
    /// Receiver fell behind; this many notifications were dropped for it
    #[error("Receiver lagged behind by {0} notifications")]
    Lagged(u64),

    #[error("Change bus closed")]
    Closed,
}

/// Fan-out of committed order mutations
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Arc<OrderNotification>>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a committed change; returns how many receivers got it
    pub fn publish(&self, notification: OrderNotification) -> usize {
        let order_id = notification.order.order_id.clone();
        let version = notification.order.version;
        match self.tx.send(Arc::new(notification)) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(order_id = %order_id, version, "No subscribers for order change");
                0
            }
        }
    }

    /// Subscribe to changes within `scope`
    pub fn subscribe(&self, scope: SubscriptionScope) -> ScopedReceiver {
        ScopedReceiver {
            scope,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Receiver that only yields notifications inside its scope
#[derive(Debug)]
pub struct ScopedReceiver {
    scope: SubscriptionScope,
    rx: broadcast::Receiver<Arc<OrderNotification>>,
}

impl ScopedReceiver {
    pub fn scope(&self) -> &SubscriptionScope {
        &self.scope
    }

    /// Wait for the next in-scope notification
    pub async fn recv(&mut self) -> Result<Arc<OrderNotification>, BusRecvError> {
        loop {
            match self.rx.recv().await {
                Ok(notification) if self.scope.matches(notification.order_id()) => {
                    return Ok(notification);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(BusRecvError::Lagged(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(BusRecvError::Closed),
            }
        }
    }

    /// Non-blocking variant; `Ok(None)` when nothing is queued
    pub fn try_recv(&mut self) -> Result<Option<Arc<OrderNotification>>, BusRecvError> {
        loop {
            match self.rx.try_recv() {
                Ok(notification) if self.scope.matches(notification.order_id()) => {
                    return Ok(Some(notification));
                }
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(BusRecvError::Lagged(skipped));
                }
                Err(broadcast::error::TryRecvError::Closed) => return Err(BusRecvError::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{
        Actor, EventPayload, OrderEvent, OrderEventType, OrderSnapshot, PaymentStatus,
    };

    fn notification(order_id: &str, version: u64) -> OrderNotification {
        let mut order = OrderSnapshot::new(order_id.to_string());
        order.version = version;
        OrderNotification {
            event: OrderEvent::new(
                version,
                order_id.to_string(),
                version,
                0,
                Actor::Vendor,
                OrderEventType::OrderPaymentChanged,
                EventPayload::OrderPaymentChanged {
                    from: PaymentStatus::Pending,
                    to: PaymentStatus::Paid,
                },
            ),
            order,
        }
    }

    #[tokio::test]
    async fn test_scoped_delivery() {
        let bus = ChangeBus::new(16);
        let mut all = bus.subscribe(SubscriptionScope::All);
        let mut one = bus.subscribe(SubscriptionScope::order("order-2"));

        assert_eq!(bus.publish(notification("order-1", 1)), 2);
        bus.publish(notification("order-2", 1));

        assert_eq!(all.recv().await.unwrap().order_id(), "order-1");
        assert_eq!(all.recv().await.unwrap().order_id(), "order-2");
        // order-1 filtered out for the targeted receiver
        assert_eq!(one.recv().await.unwrap().order_id(), "order-2");
        assert!(one.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = ChangeBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(notification("order-1", 1)), 0);
    }

    #[tokio::test]
    async fn test_lagged_receiver() {
        let bus = ChangeBus::new(2);
        let mut rx = bus.subscribe(SubscriptionScope::All);
        for v in 1..=5 {
            bus.publish(notification("order-1", v));
        }

        assert!(matches!(rx.recv().await, Err(BusRecvError::Lagged(3))));
        // Oldest retained notifications follow
        assert_eq!(rx.recv().await.unwrap().version(), 4);
    }

    #[tokio::test]
    async fn test_closed_when_bus_dropped() {
        let bus = ChangeBus::new(2);
        let mut rx = bus.subscribe(SubscriptionScope::All);
        drop(bus);
        assert_eq!(rx.recv().await.unwrap_err(), BusRecvError::Closed);
    }
}
