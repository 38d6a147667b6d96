//! Shared types for the order lifecycle

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Payment
// ============================================================================

/// Payment state - independent axis from the order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Payment method, fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
}

// ============================================================================
// Service Type
// ============================================================================

/// How the order is handed over
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Picked up at the counter with the token
    #[default]
    DineIn,
    /// Carried out to the customer's location
    Delivery,
}

/// Delivery destination (DELIVERY orders only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub location: String,
    #[serde(default)]
    pub instructions: String,
    pub phone_number: String,
}

// ============================================================================
// Item Types
// ============================================================================

/// Item snapshot - copy of menu data at order time
///
/// Later menu edits never touch this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItemSnapshot {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderItemSnapshot {
    /// unit_price × quantity, `None` on overflow
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Σ line totals, `None` if any step overflows
pub fn order_total(items: &[OrderItemSnapshot]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()?))
}

/// Cart item input - what the client sends (prices are resolved server-side)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItemInput {
    pub menu_item_id: String,
    pub quantity: i32,
}

impl CartItemInput {
    pub fn new(menu_item_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            quantity,
        }
    }
}

/// New order request (customer checkout)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: String,
    pub items: Vec<CartItemInput>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_details: Option<DeliveryDetails>,
}

impl CreateOrderRequest {
    /// DINE_IN / CASH request
    pub fn dine_in(
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
        items: Vec<CartItemInput>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            customer_name: customer_name.into(),
            items,
            payment_method: PaymentMethod::Cash,
            order_type: OrderType::DineIn,
            delivery_details: None,
        }
    }

    pub fn delivery(mut self, details: DeliveryDetails) -> Self {
        self.order_type = OrderType::Delivery;
        self.delivery_details = Some(details);
        self
    }
}

// ============================================================================
// Actor / Subscription
// ============================================================================

/// Who issued a mutation (recorded on every event for audit)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    Customer {
        customer_id: String,
    },
    #[default]
    Vendor,
}

impl Actor {
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Actor::Customer {
            customer_id: customer_id.into(),
        }
    }
}

/// Subscription scope for the change feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "scope", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionScope {
    /// A single order (customer tracking their own order)
    Order { order_id: String },
    /// Every order (vendor dashboard)
    All,
}

impl SubscriptionScope {
    pub fn order(order_id: impl Into<String>) -> Self {
        SubscriptionScope::Order {
            order_id: order_id.into(),
        }
    }

    /// Whether an order falls inside this scope
    pub fn matches(&self, order_id: &str) -> bool {
        match self {
            SubscriptionScope::Order { order_id: scoped } => scoped == order_id,
            SubscriptionScope::All => true,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Command error - returned to clients verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    /// Offending field / state, so clients can render a precise message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    ShopClosed,
    CustomerBanned,
    InvalidItems,
    InvalidTransition,
    PaymentRequired,
    ConcurrentModification,
    NotFound,
    StorageUnavailable,
    TokenPoolExhausted,
    InternalError,
}

impl CommandErrorCode {
    /// Whether the caller may retry (after re-reading state)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommandErrorCode::ConcurrentModification | CommandErrorCode::StorageUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let item = OrderItemSnapshot {
            menu_item_id: "chai".to_string(),
            name: "Chai".to_string(),
            unit_price: Decimal::from(20),
            quantity: 2,
        };
        assert_eq!(item.line_total(), Some(Decimal::from(40)));
    }

    #[test]
    fn test_totals_overflow_to_none() {
        let huge = OrderItemSnapshot {
            menu_item_id: "gold".to_string(),
            name: "Gold".to_string(),
            unit_price: Decimal::MAX,
            quantity: 2,
        };
        assert_eq!(huge.line_total(), None);

        let single = OrderItemSnapshot { quantity: 1, ..huge };
        assert_eq!(order_total(&[single.clone()]), Some(Decimal::MAX));
        assert_eq!(order_total(&[single.clone(), single]), None);
    }

    #[test]
    fn test_scope_matches() {
        let scope = SubscriptionScope::order("order-1");
        assert!(scope.matches("order-1"));
        assert!(!scope.matches("order-2"));
        assert!(SubscriptionScope::All.matches("anything"));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&CommandErrorCode::ConcurrentModification).unwrap();
        assert_eq!(json, "\"CONCURRENT_MODIFICATION\"");
        assert!(CommandErrorCode::ConcurrentModification.is_retryable());
        assert!(!CommandErrorCode::InvalidTransition.is_retryable());
    }

    #[test]
    fn test_actor_serialization() {
        let actor = Actor::customer("cust-1");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["kind"], "CUSTOMER");
        assert_eq!(json["customer_id"], "cust-1");
    }
}
