use super::*;
use crate::services::StaticMenu;
use crate::utils::ManualClock;
use rust_decimal::Decimal;
use shared::models::MenuItem;
use shared::order::{
    CartItemInput, CommandErrorCode, DeliveryDetails, EventPayload, OrderEventType, OrderType,
    PaymentMethod,
};

const START_MS: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 60 * 60 * 1000;

struct TestEnv {
    manager: OrdersManager,
    clock: Arc<ManualClock>,
    menu: Arc<StaticMenu>,
}

fn test_menu() -> StaticMenu {
    let mut samosa = MenuItem::new("samosa", "Samosa", Decimal::from(15));
    samosa.is_available = false;
    StaticMenu::with_items([
        MenuItem::new("burger", "Burger", Decimal::from(85)),
        MenuItem::new("chai", "Chai", Decimal::from(20)),
        MenuItem::new("maggi", "Masala Maggi", Decimal::from(45)),
        samosa,
    ])
}

fn create_test_env() -> TestEnv {
    let storage = OrderStorage::open_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(START_MS));
    let menu = Arc::new(test_menu());
    let manager = OrdersManager::with_storage(storage, menu.clone(), clock.clone());
    TestEnv {
        manager,
        clock,
        menu,
    }
}

fn create_test_manager() -> OrdersManager {
    create_test_env().manager
}

fn vendor() -> Actor {
    Actor::Vendor
}

/// Burger ×1 + Chai ×2
fn burger_and_chai(customer_id: &str) -> CreateOrderRequest {
    CreateOrderRequest::dine_in(
        customer_id,
        format!("Customer {customer_id}"),
        vec![CartItemInput::new("burger", 1), CartItemInput::new("chai", 2)],
    )
}

fn place_order(manager: &OrdersManager, customer_id: &str) -> OrderSnapshot {
    manager
        .create_order(burger_and_chai(customer_id))
        .expect("Failed to create order")
}

fn delivery_details() -> DeliveryDetails {
    DeliveryDetails {
        location: "Hostel 4, Room 210".to_string(),
        instructions: "Call at the gate".to_string(),
        phone_number: "9000000001".to_string(),
    }
}

/// Transition using the order's current version
fn advance(manager: &OrdersManager, order: &OrderSnapshot, to: OrderStatus) -> OrderSnapshot {
    manager
        .transition_status(vendor(), &order.order_id, to, order.version)
        .unwrap_or_else(|e| panic!("{} -> {} failed: {e}", order.status, to))
}

fn mark_paid(manager: &OrdersManager, order: &OrderSnapshot) -> OrderSnapshot {
    manager
        .set_payment_status(vendor(), &order.order_id, PaymentStatus::Paid, order.version)
        .expect("Failed to mark paid")
}

/// Create and cancel one order for `customer_id`
fn place_and_cancel(manager: &OrdersManager, customer_id: &str) -> OrderSnapshot {
    let order = place_order(manager, customer_id);
    manager
        .transition_status(
            Actor::customer(customer_id),
            &order.order_id,
            OrderStatus::Cancelled,
            order.version,
        )
        .expect("Failed to cancel")
}
