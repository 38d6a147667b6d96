//! SetPaymentStatus command handler
//!
//! Payment is an independent axis: legal in every order status, including
//! CANCELLED (refund bookkeeping). Re-setting the current value is still a
//! versioned mutation.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, PaymentStatus};

/// SetPaymentStatus action
#[derive(Debug, Clone)]
pub struct SetPaymentStatusAction {
    pub order_id: String,
    pub status: PaymentStatus,
    pub expected_version: u64,
}

#[async_trait]
impl CommandHandler for SetPaymentStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_versioned(&self.order_id, self.expected_version)?;

        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            snapshot.version + 1,
            metadata.timestamp,
            metadata.actor.clone(),
            OrderEventType::OrderPaymentChanged,
            EventPayload::OrderPaymentChanged {
                from: snapshot.payment_status,
                to: self.status,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::order::{Actor, OrderSnapshot, OrderStatus};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            actor: Actor::Vendor,
            timestamp: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_payment_legal_on_cancelled_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.status = OrderStatus::Cancelled;
        snapshot.version = 1;
        storage.save_order(&txn, &snapshot, None).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = SetPaymentStatusAction {
            order_id: "order-1".to_string(),
            status: PaymentStatus::Paid,
            expected_version: 1,
        };
        let events = action
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events[0].version, 2);
        assert_eq!(
            events[0].payload,
            EventPayload::OrderPaymentChanged {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Paid,
            }
        );
    }

    #[tokio::test]
    async fn test_same_value_still_versioned() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .save_order(&txn, &OrderSnapshot::new("order-1".to_string()), None)
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = SetPaymentStatusAction {
            order_id: "order-1".to_string(),
            status: PaymentStatus::Pending,
            expected_version: 0,
        };
        let events = action
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();
        assert_eq!(events[0].version, 1);

        let stale = SetPaymentStatusAction {
            expected_version: 5,
            ..action
        };
        assert!(matches!(
            stale.execute(&mut ctx, &create_test_metadata()).await,
            Err(OrderError::ConcurrentModification { .. })
        ));
    }
}
