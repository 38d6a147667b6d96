//! Core traits of the command/event pipeline
//!
//! - [`CommandHandler`]: validates a command against current state and emits events
//! - [`EventApplier`]: folds one event into a snapshot (pure)
//! - [`CommandContext`]: transaction-scoped view of storage handed to actions

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use redb::WriteTransaction;
use serde_json::json;
use shared::order::{Actor, CommandError, CommandErrorCode, OrderEvent, OrderSnapshot, OrderStatus};
use thiserror::Error;

use super::storage::{OrderStorage, StorageError};

/// Pickup tokens are `R-100` ..= `R-999`
pub const TOKEN_MIN: u16 = 100;
pub const TOKEN_MAX: u16 = 999;
const TOKEN_PREFIX: &str = "R-";
/// Random draws before falling back to a linear scan of the pool
const TOKEN_RANDOM_ATTEMPTS: usize = 32;

pub fn format_token(n: u16) -> String {
    format!("{TOKEN_PREFIX}{n:03}")
}

/// Domain errors raised while validating or executing a command
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Shop is closed")]
    ShopClosed,

    #[error("Customer {customer_id} is banned until {expires_at}")]
    CustomerBanned { customer_id: String, expires_at: i64 },

    #[error("Invalid {field}: {reason}")]
    InvalidItems { field: String, reason: String },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} must be paid before it is delivered")]
    PaymentRequired(String),

    #[error("Order {order_id} was modified: expected version {expected}, found {actual}")]
    ConcurrentModification {
        order_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("All pickup tokens are in use")]
    TokenPoolExhausted,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderError {
    pub fn invalid_items(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OrderError::InvalidItems {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> CommandErrorCode {
        match self {
            OrderError::ShopClosed => CommandErrorCode::ShopClosed,
            OrderError::CustomerBanned { .. } => CommandErrorCode::CustomerBanned,
            OrderError::InvalidItems { .. } => CommandErrorCode::InvalidItems,
            OrderError::InvalidTransition { .. } => CommandErrorCode::InvalidTransition,
            OrderError::PaymentRequired(_) => CommandErrorCode::PaymentRequired,
            OrderError::ConcurrentModification { .. } => CommandErrorCode::ConcurrentModification,
            OrderError::OrderNotFound(_) => CommandErrorCode::NotFound,
            OrderError::TokenPoolExhausted => CommandErrorCode::TokenPoolExhausted,
            OrderError::Storage(_) => CommandErrorCode::StorageUnavailable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Structured context for clients (offending field / state)
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            OrderError::CustomerBanned {
                customer_id,
                expires_at,
            } => Some(json!({ "customer_id": customer_id, "ban_expires_at": expires_at })),
            OrderError::InvalidItems { field, .. } => Some(json!({ "field": field })),
            OrderError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            OrderError::PaymentRequired(order_id) | OrderError::OrderNotFound(order_id) => {
                Some(json!({ "order_id": order_id }))
            }
            OrderError::ConcurrentModification {
                order_id,
                expected,
                actual,
            } => Some(json!({ "order_id": order_id, "expected": expected, "actual": actual })),
            OrderError::ShopClosed | OrderError::TokenPoolExhausted | OrderError::Storage(_) => {
                None
            }
        }
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            StorageError::VersionConflict {
                order_id,
                expected,
                actual,
            } => OrderError::ConcurrentModification {
                order_id,
                expected,
                actual,
            },
            other => OrderError::Storage(other.to_string()),
        }
    }
}

impl From<OrderError> for CommandError {
    fn from(err: OrderError) -> Self {
        let error = CommandError::new(err.code(), err.to_string());
        match err.details() {
            Some(details) => error.with_details(details),
            None => error,
        }
    }
}

/// Who and when, stamped on every event of one command
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub actor: Actor,
    /// Server clock reading taken once per command (Unix millis)
    pub timestamp: i64,
}

/// Transaction-scoped context handed to actions
///
/// Snapshots loaded or produced during the command are cached here so that
/// the manager can persist exactly what changed.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    sequence: u64,
    snapshots: HashMap<String, OrderSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Allocate the next global event sequence
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Highest sequence handed out so far
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Load a snapshot (modified copy first, then storage)
    pub fn load_snapshot(&self, order_id: &str) -> Result<OrderSnapshot, OrderError> {
        if let Some(snapshot) = self.snapshots.get(order_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_order_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Load the stored snapshot and check it is at `expected_version`
    pub fn load_versioned(
        &self,
        order_id: &str,
        expected_version: u64,
    ) -> Result<OrderSnapshot, OrderError> {
        let snapshot = self.load_snapshot(order_id)?;
        if snapshot.version != expected_version {
            return Err(OrderError::ConcurrentModification {
                order_id: order_id.to_string(),
                expected: expected_version,
                actual: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    pub fn save_snapshot(&mut self, snapshot: OrderSnapshot) {
        self.snapshots.insert(snapshot.order_id.clone(), snapshot);
    }

    pub fn modified_snapshots(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.snapshots.values()
    }

    /// Whether `token` is free or already held by `order_id`
    pub fn token_available_for(&self, token: &str, order_id: &str) -> Result<bool, OrderError> {
        Ok(self
            .storage
            .token_holder_txn(self.txn, token)?
            .is_none_or(|holder| holder == order_id))
    }

    /// Pick a free pickup token
    ///
    /// Random draws first, then a linear scan so that a nearly full pool
    /// still finds the last free slot. Claiming is done by the manager when
    /// the new snapshot is persisted, inside the same transaction.
    pub fn allocate_token(&self, order_id: &str) -> Result<String, OrderError> {
        let mut rng = rand::thread_rng();
        for _ in 0..TOKEN_RANDOM_ATTEMPTS {
            let token = format_token(rng.gen_range(TOKEN_MIN..=TOKEN_MAX));
            if self.token_available_for(&token, order_id)? {
                return Ok(token);
            }
        }

        for n in TOKEN_MIN..=TOKEN_MAX {
            let token = format_token(n);
            if self.token_available_for(&token, order_id)? {
                return Ok(token);
            }
        }

        Err(OrderError::TokenPoolExhausted)
    }
}

/// Validates a command and produces the events describing its effect
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError>;
}

/// Folds one event into a snapshot. Must be pure.
#[enum_dispatch::enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token() {
        assert_eq!(format_token(100), "R-100");
        assert_eq!(format_token(999), "R-999");
    }

    #[test]
    fn test_allocate_token_skips_held_tokens() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for n in TOKEN_MIN..TOKEN_MAX {
            storage
                .claim_token(&txn, &format_token(n), &format!("order-{n}"))
                .unwrap();
        }

        let ctx = CommandContext::new(&txn, &storage, 0);
        assert_eq!(ctx.allocate_token("new").unwrap(), "R-999");

        storage.claim_token(&txn, "R-999", "other").unwrap();
        assert_eq!(
            ctx.allocate_token("new").unwrap_err(),
            OrderError::TokenPoolExhausted
        );
        // A holder may keep its own token
        assert!(ctx.token_available_for("R-999", "other").unwrap());
    }

    #[test]
    fn test_load_versioned_rejects_stale_version() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.version = 2;
        storage.save_order(&txn, &snapshot, None).unwrap();

        let ctx = CommandContext::new(&txn, &storage, 0);
        assert!(ctx.load_versioned("order-1", 2).is_ok());
        assert_eq!(
            ctx.load_versioned("order-1", 1).unwrap_err(),
            OrderError::ConcurrentModification {
                order_id: "order-1".to_string(),
                expected: 1,
                actual: 2,
            }
        );
        assert_eq!(
            ctx.load_snapshot("missing").unwrap_err().code(),
            CommandErrorCode::NotFound
        );
    }

    #[test]
    fn test_error_details_and_codes() {
        let err = OrderError::invalid_items("delivery_details", "required for DELIVERY");
        let cmd: CommandError = err.into();
        assert_eq!(cmd.code, CommandErrorCode::InvalidItems);
        assert_eq!(cmd.details.unwrap()["field"], "delivery_details");

        let conflict: OrderError = StorageError::VersionConflict {
            order_id: "o".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(conflict.is_retryable());
        assert!(!OrderError::ShopClosed.is_retryable());
    }
}
