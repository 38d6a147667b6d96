//! Shared types for the stall order engine
//!
//! Domain types used by the server and by any client talking to it:
//! orders, events, error codes, menu/ban/settings models.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
