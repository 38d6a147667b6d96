//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

mod order_created;
mod order_payment_changed;
mod order_status_changed;

pub use order_created::OrderCreatedApplier;
pub use order_payment_changed::OrderPaymentChangedApplier;
pub use order_status_changed::OrderStatusChangedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    OrderCreated(OrderCreatedApplier),
    OrderStatusChanged(OrderStatusChangedApplier),
    OrderPaymentChanged(OrderPaymentChangedApplier),
}

/// Convert OrderEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&OrderEvent> for EventAction {
    fn from(event: &OrderEvent) -> Self {
        match &event.payload {
            EventPayload::OrderCreated { .. } => EventAction::OrderCreated(OrderCreatedApplier),
            EventPayload::OrderStatusChanged { .. } => {
                EventAction::OrderStatusChanged(OrderStatusChangedApplier)
            }
            EventPayload::OrderPaymentChanged { .. } => {
                EventAction::OrderPaymentChanged(OrderPaymentChangedApplier)
            }
        }
    }
}

/// Bookkeeping shared by every applier
pub(crate) fn stamp(snapshot: &mut OrderSnapshot, event: &OrderEvent) {
    snapshot.version = event.version;
    snapshot.last_sequence = event.sequence;
    // updated_at never moves backwards, even if the clock does
    snapshot.updated_at = snapshot.updated_at.max(event.timestamp);
}
