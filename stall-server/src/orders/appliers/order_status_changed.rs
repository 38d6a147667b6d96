//! OrderStatusChanged event applier

use super::stamp;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// OrderStatusChanged applier
pub struct OrderStatusChangedApplier;

impl EventApplier for OrderStatusChangedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderStatusChanged { to, token, .. } = &event.payload {
            snapshot.status = *to;
            if let Some(token) = token {
                snapshot.token = token.clone();
            }

            stamp(snapshot, event);
        }
    }
}
