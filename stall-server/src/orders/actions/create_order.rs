//! CreateOrder command handler
//!
//! Builds the OrderCreated event for a new order. Menu resolution, the shop
//! gate and the ban gate run in the manager before the transaction opens;
//! this handler checks the service-type fields, fixes the total and picks a
//! pickup token under the write transaction.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_CART_LINES, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN,
    validate_order_optional_text, validate_order_text,
};
use shared::order::{
    DeliveryDetails, EventPayload, OrderEvent, OrderEventType, OrderItemSnapshot, OrderType,
    PaymentMethod, order_total,
};

/// CreateOrder action
#[derive(Debug, Clone)]
pub struct CreateOrderAction {
    pub order_id: String,
    pub customer_id: String,
    pub customer_name: String,
    /// Already resolved against the menu
    pub items: Vec<OrderItemSnapshot>,
    pub payment_method: PaymentMethod,
    pub order_type: OrderType,
    pub delivery_details: Option<DeliveryDetails>,
}

impl CreateOrderAction {
    fn validate(&self) -> Result<(), OrderError> {
        validate_order_text(&self.customer_id, "customer_id", MAX_SHORT_TEXT_LEN)?;
        validate_order_optional_text(&self.customer_name, "customer_name", MAX_NAME_LEN)?;
        if self.items.is_empty() {
            return Err(OrderError::invalid_items("items", "cart is empty"));
        }
        if self.items.len() > MAX_CART_LINES {
            return Err(OrderError::invalid_items(
                "items",
                format!("at most {MAX_CART_LINES} lines per order"),
            ));
        }

        match (self.order_type, &self.delivery_details) {
            (OrderType::Delivery, None) => Err(OrderError::invalid_items(
                "delivery_details",
                "required for DELIVERY orders",
            )),
            (OrderType::Delivery, Some(details)) => {
                validate_order_text(&details.location, "delivery_details", MAX_ADDRESS_LEN)?;
                validate_order_text(&details.phone_number, "delivery_details", MAX_SHORT_TEXT_LEN)?;
                validate_order_optional_text(&details.instructions, "delivery_details", MAX_NOTE_LEN)
            }
            (OrderType::DineIn, Some(_)) => Err(OrderError::invalid_items(
                "delivery_details",
                "not allowed for DINE_IN orders",
            )),
            (OrderType::DineIn, None) => Ok(()),
        }
    }
}

#[async_trait]
impl CommandHandler for CreateOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate input
        self.validate()?;

        // 2. Fix the total from the item snapshots
        let total_amount = order_total(&self.items)
            .ok_or_else(|| OrderError::invalid_items("items", "order total out of range"))?;

        // 3. Pick a pickup token (checked against open orders in this transaction)
        let token = ctx.allocate_token(&self.order_id)?;

        // 4. Allocate sequence number
        let seq = ctx.next_sequence();

        // 5. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            0,
            metadata.timestamp,
            metadata.actor.clone(),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                token,
                customer_id: self.customer_id.clone(),
                customer_name: self.customer_name.clone(),
                items: self.items.clone(),
                total_amount,
                payment_method: self.payment_method,
                order_type: self.order_type,
                delivery_details: self.delivery_details.clone(),
            },
        );

        Ok(vec![event])
    }
}
