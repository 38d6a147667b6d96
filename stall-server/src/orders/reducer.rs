//! Order snapshot utilities
//!
//! - `resolve_items`: turn cart input into immutable item snapshots using the menu
//! - `replay`: rebuild an order from its event stream via the appliers

use super::appliers::EventAction;
use super::traits::{EventApplier, OrderError};
use crate::services::MenuLookup;
use shared::order::{CartItemInput, OrderEvent, OrderItemSnapshot, OrderSnapshot};

/// Resolve cart input against the menu
///
/// Prices and names come from the menu, never from the client. Duplicate
/// menu ids stay separate lines in cart order.
pub fn resolve_items(
    items: &[CartItemInput],
    menu: &dyn MenuLookup,
) -> Result<Vec<OrderItemSnapshot>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::invalid_items("items", "cart is empty"));
    }

    items
        .iter()
        .map(|input| {
            if input.quantity <= 0 {
                return Err(OrderError::invalid_items(
                    "quantity",
                    format!(
                        "quantity for {} must be positive, got {}",
                        input.menu_item_id, input.quantity
                    ),
                ));
            }

            let menu_item = menu.get_menu_item(&input.menu_item_id).ok_or_else(|| {
                OrderError::invalid_items(
                    "menu_item_id",
                    format!("unknown menu item {}", input.menu_item_id),
                )
            })?;
            if !menu_item.is_available {
                return Err(OrderError::invalid_items(
                    "menu_item_id",
                    format!("{} is not available", menu_item.name),
                ));
            }

            Ok(OrderItemSnapshot {
                menu_item_id: menu_item.id,
                name: menu_item.name,
                unit_price: menu_item.price,
                quantity: input.quantity,
            })
        })
        .collect()
}

/// Fold an order's events into a snapshot
///
/// Returns `None` for an empty stream.
pub fn replay(order_id: &str, events: &[OrderEvent]) -> Option<OrderSnapshot> {
    if events.is_empty() {
        return None;
    }

    let mut snapshot = OrderSnapshot::new(order_id.to_string());
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    Some(snapshot)
}
