//! Data models
//!
//! Collaborator-owned records the order engine reads (menu) and the small
//! owned stores that sit next to the orders (bans, settings).

pub mod ban;
pub mod menu_item;
pub mod settings;

// Re-exports
pub use ban::*;
pub use menu_item::*;
pub use settings::*;
