//! OrderPaymentChanged event applier

use super::stamp;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// OrderPaymentChanged applier
pub struct OrderPaymentChangedApplier;

impl EventApplier for OrderPaymentChangedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderPaymentChanged { to, .. } = &event.payload {
            snapshot.payment_status = *to;
            stamp(snapshot, event);
        }
    }
}
