//! Order Lifecycle Module
//!
//! This module provides types for the order lifecycle engine:
//! - Events: Immutable facts recorded after command processing
//! - Snapshots: Computed order state from event stream
//! - Types: Items, payment, scopes and error codes

pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use event::{EventPayload, OrderEvent, OrderEventType, OrderNotification};
pub use snapshot::{OrderSnapshot, OrderStatus};
pub use types::*;
