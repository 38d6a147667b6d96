//! Order lifecycle engine
//!
//! - **manager**: OrdersManager, command processing and event generation
//! - **actions**: one CommandHandler per mutation
//! - **appliers**: pure event → snapshot folds
//! - **storage**: redb persistence for events, snapshots, tokens, bans, settings
//! - **reducer**: item resolution and event replay
//! - **sync**: reconciling observer sessions over the change bus
//! - **verify_scheduler**: periodic snapshot/replay consistency check
//!
//! # Architecture
//!
//! ```text
//! Command → OrdersManager → Event → Storage (redb)
//!                 ↓                      ↓
//!             ChangeBus           Snapshot Update
//!                 ↓
//!      SyncSession (All / Order{id})
//! ```

// enum_dispatch expands the trait before the applier enum
pub mod traits;
pub mod actions;
pub mod appliers;
pub mod manager;
pub mod reducer;
pub mod storage;
pub mod sync;
pub mod verify_scheduler;

// Re-exports
pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use storage::{OrderFilter, OrderStorage, StorageError};
pub use sync::SyncSession;
pub use traits::OrderError;
pub use verify_scheduler::{VerifyReport, VerifyScheduler};

// Re-export shared types for convenience
pub use shared::order::{
    CommandError, CommandErrorCode, EventPayload, OrderEvent, OrderEventType, OrderSnapshot,
    OrderStatus,
};
