//! TransitionStatus command handler
//!
//! Moves an order along the status table. Reopening a delivered order keeps
//! its token when it is still free, otherwise a fresh one is drawn and
//! carried on the event.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus, OrderType};

/// TransitionStatus action
#[derive(Debug, Clone)]
pub struct TransitionStatusAction {
    pub order_id: String,
    pub to: OrderStatus,
    pub expected_version: u64,
}

#[async_trait]
impl CommandHandler for TransitionStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load snapshot at the caller's version
        let snapshot = ctx.load_versioned(&self.order_id, self.expected_version)?;
        let from = snapshot.status;

        // 2. Transition table
        if !from.can_transition_to(self.to, snapshot.order_type) {
            return Err(OrderError::InvalidTransition { from, to: self.to });
        }

        // 3. Counter pickup needs payment first
        if self.to == OrderStatus::Delivered
            && snapshot.order_type == OrderType::DineIn
            && !snapshot.is_paid()
        {
            return Err(OrderError::PaymentRequired(self.order_id.clone()));
        }

        // 4. Reopening: reclaim the old token or draw a new one
        let token = if !from.is_open() && self.to.is_open() {
            if ctx.token_available_for(&snapshot.token, &self.order_id)? {
                None
            } else {
                let fresh = ctx.allocate_token(&self.order_id)?;
                tracing::info!(
                    order_id = %self.order_id,
                    old_token = %snapshot.token,
                    new_token = %fresh,
                    "Token taken while order was closed, reassigned"
                );
                Some(fresh)
            }
        } else {
            None
        };

        // 5. Allocate sequence number
        let seq = ctx.next_sequence();

        // 6. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            snapshot.version + 1,
            metadata.timestamp,
            metadata.actor.clone(),
            OrderEventType::OrderStatusChanged,
            EventPayload::OrderStatusChanged {
                from,
                to: self.to,
                token,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::order::{Actor, OrderSnapshot, PaymentStatus};

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            actor: Actor::Vendor,
            timestamp: 1_700_000_000_000,
        }
    }

    fn stored_order(
        storage: &OrderStorage,
        txn: &redb::WriteTransaction,
        status: OrderStatus,
        order_type: OrderType,
        payment: PaymentStatus,
    ) {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.token = "R-123".to_string();
        snapshot.status = status;
        snapshot.order_type = order_type;
        snapshot.payment_status = payment;
        snapshot.version = 3;
        storage.save_order(txn, &snapshot, None).unwrap();
    }

    fn action(to: OrderStatus, expected_version: u64) -> TransitionStatusAction {
        TransitionStatusAction {
            order_id: "order-1".to_string(),
            to,
            expected_version,
        }
    }

    #[tokio::test]
    async fn test_legal_transition() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::New, OrderType::DineIn, PaymentStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 10);

        let events = action(OrderStatus::Cooking, 3)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events[0].version, 4);
        assert_eq!(events[0].sequence, 11);
        assert_eq!(
            events[0].payload,
            EventPayload::OrderStatusChanged {
                from: OrderStatus::New,
                to: OrderStatus::Cooking,
                token: None,
            }
        );
    }

    #[tokio::test]
    async fn test_stale_version_checked_before_table() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::Cooking, OrderType::DineIn, PaymentStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        // Replay of an already-applied NEW -> COOKING
        let err = action(OrderStatus::Cooking, 2)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::ConcurrentModification {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_illegal_and_same_status_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::New, OrderType::DineIn, PaymentStatus::Paid);
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let metadata = create_test_metadata();

        for to in [OrderStatus::New, OrderStatus::Ready, OrderStatus::Delivered] {
            let err = action(to, 3).execute(&mut ctx, &metadata).await.unwrap_err();
            assert_eq!(
                err,
                OrderError::InvalidTransition {
                    from: OrderStatus::New,
                    to
                }
            );
        }
    }

    #[tokio::test]
    async fn test_dine_in_delivery_requires_payment() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::Ready, OrderType::DineIn, PaymentStatus::Pending);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let err = action(OrderStatus::Delivered, 3)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::PaymentRequired("order-1".to_string()));
    }

    #[tokio::test]
    async fn test_delivery_order_delivered_unpaid() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(
            &storage,
            &txn,
            OrderStatus::OutForDelivery,
            OrderType::Delivery,
            PaymentStatus::Pending,
        );
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        // Cash on delivery: the rider collects at the door
        let events = action(OrderStatus::Delivered, 3)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_undo_delivered_reassigns_taken_token() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::Delivered, OrderType::DineIn, PaymentStatus::Paid);
        storage.claim_token(&txn, "R-123", "order-2").unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(OrderStatus::Ready, 3)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        match &events[0].payload {
            EventPayload::OrderStatusChanged { token: Some(token), .. } => {
                assert_ne!(token, "R-123");
            }
            other => panic!("Expected a reassigned token, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undo_delivered_keeps_free_token() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        stored_order(&storage, &txn, OrderStatus::Delivered, OrderType::DineIn, PaymentStatus::Paid);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(OrderStatus::Ready, 3)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();
        assert!(matches!(
            events[0].payload,
            EventPayload::OrderStatusChanged { token: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_order() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let err = action(OrderStatus::Cooking, 0)
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::OrderNotFound("order-1".to_string()));
    }
}
