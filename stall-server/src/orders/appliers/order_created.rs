//! OrderCreated event applier

use super::stamp;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus, PaymentStatus};

/// OrderCreated applier
pub struct OrderCreatedApplier;

impl EventApplier for OrderCreatedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCreated {
            token,
            customer_id,
            customer_name,
            items,
            total_amount,
            payment_method,
            order_type,
            delivery_details,
        } = &event.payload
        {
            snapshot.order_id = event.order_id.clone();
            snapshot.token = token.clone();
            snapshot.customer_id = customer_id.clone();
            snapshot.customer_name = customer_name.clone();
            snapshot.items = items.clone();
            snapshot.total_amount = *total_amount;
            snapshot.status = OrderStatus::New;
            snapshot.payment_status = PaymentStatus::Pending;
            snapshot.payment_method = *payment_method;
            snapshot.order_type = *order_type;
            snapshot.delivery_details = delivery_details.clone();
            snapshot.created_at = event.timestamp;

            stamp(snapshot, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{Actor, OrderEventType, OrderItemSnapshot, OrderType, PaymentMethod};

    fn create_event() -> OrderEvent {
        OrderEvent::new(
            1,
            "order-1".to_string(),
            0,
            1_000,
            Actor::customer("cust-1"),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                token: "R-321".to_string(),
                customer_id: "cust-1".to_string(),
                customer_name: "Asha".to_string(),
                items: vec![OrderItemSnapshot {
                    menu_item_id: "chai".to_string(),
                    name: "Chai".to_string(),
                    unit_price: Decimal::from(20),
                    quantity: 2,
                }],
                total_amount: Decimal::from(40),
                payment_method: PaymentMethod::Upi,
                order_type: OrderType::DineIn,
                delivery_details: None,
            },
        )
    }

    #[test]
    fn test_order_created_fills_snapshot() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        let event = create_event();

        OrderCreatedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.token, "R-321");
        assert_eq!(snapshot.customer_name, "Asha");
        assert_eq!(snapshot.status, OrderStatus::New);
        assert_eq!(snapshot.payment_status, PaymentStatus::Pending);
        assert_eq!(snapshot.payment_method, PaymentMethod::Upi);
        assert_eq!(snapshot.computed_total(), Some(snapshot.total_amount));
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.created_at, 1_000);
        assert_eq!(snapshot.updated_at, 1_000);
        assert_eq!(snapshot.last_sequence, 1);
    }

    #[test]
    fn test_other_payload_ignored() {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        let mut event = create_event();
        event.payload = EventPayload::OrderPaymentChanged {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Paid,
        };

        OrderCreatedApplier.apply(&mut snapshot, &event);
        assert_eq!(snapshot, OrderSnapshot::new("order-1".to_string()));
    }
}
