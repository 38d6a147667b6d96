//! redb-based storage layer for the order engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(order_id, sequence)` | `OrderEvent` | Event stream (append-only) |
//! | `orders` | `order_id` | `OrderSnapshot` | Current order state |
//! | `active_orders` | `order_id` | `()` | Open (queued) order index |
//! | `tokens` | `token` | `order_id` | Pickup tokens held by open orders |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//! | `strikes` | `customer_id` | `StrikeRecord` | Lifetime cancellation counters |
//! | `bans` | `customer_id` | `BanRecord` | Issued bans |
//! | `settings` | `"system"` | `SystemSettings` | Vendor settings singleton |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time. Every order mutation
//! reads, checks `version` and writes inside one write transaction, which
//! makes [`OrderStorage::save_order`] a compare-and-swap.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::{Deserialize, Serialize};
use shared::models::{BanRecord, StrikeRecord, SystemSettings};
use shared::order::{OrderEvent, OrderSnapshot, OrderStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (order_id, sequence), value = JSON-serialized OrderEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Table for storing orders: key = order_id, value = JSON-serialized OrderSnapshot
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for tracking open orders: key = order_id, value = empty (existence check)
const ACTIVE_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_orders");

/// Table for pickup tokens: key = token, value = holding order_id
const TOKENS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tokens");

/// Table for sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Table for strike counters: key = customer_id, value = JSON-serialized StrikeRecord
const STRIKES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("strikes");

/// Table for bans: key = customer_id, value = JSON-serialized BanRecord
const BANS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bans");

/// Table for settings: key = "system", value = JSON-serialized SystemSettings
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const SEQUENCE_KEY: &str = "seq";
const SETTINGS_KEY: &str = "system";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    OrderExists(String),

    #[error("Version conflict on {order_id}: expected {expected}, found {actual}")]
    VersionConflict {
        order_id: String,
        expected: u64,
        actual: u64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order query filter (vendor dashboard / customer history)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Only orders still in the queue
    #[serde(default)]
    pub active_only: bool,
}

impl OrderFilter {
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, order: &OrderSnapshot) -> bool {
        if self.active_only && !order.is_open() {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(ref customer_id) = self.customer_id
            && &order.customer_id != customer_id
        {
            return false;
        }
        true
    }
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub order_count: u64,
    pub active_order_count: u64,
    pub event_count: u64,
    pub ban_count: u64,
    pub current_sequence: u64,
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable as soon as `commit()` returns (copy-on-write
    /// with an atomic root swap), so a crash never leaves a half-written order.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = write_txn.open_table(TOKENS_TABLE)?;
            let _ = write_txn.open_table(STRIKES_TABLE)?;
            let _ = write_txn.open_table(BANS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Persist the sequence counter (called once per command, before commit)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    /// Get current sequence (within transaction)
    pub fn get_current_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &OrderEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.order_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for an order
    pub fn get_events_for_order(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Snapshot and its events, read in one transaction
    pub fn get_order_with_events(
        &self,
        order_id: &str,
    ) -> StorageResult<(Option<OrderSnapshot>, Vec<OrderEvent>)> {
        let read_txn = self.db.begin_read()?;

        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let order = match orders.get(order_id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };

        let table = read_txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok((order, events))
    }

    /// Get events since a given sequence (across all orders)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Order Operations ==========

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Save an order, compare-and-swap on `version`
    ///
    /// `expected_version = None` means the order must not exist yet.
    /// Otherwise the stored version must equal `expected_version`.
    /// Keeps the open-order index in step with the order status.
    pub fn save_order(
        &self,
        txn: &WriteTransaction,
        order: &OrderSnapshot,
        expected_version: Option<u64>,
    ) -> StorageResult<()> {
        let current = self.get_order_txn(txn, &order.order_id)?;
        match (current, expected_version) {
            (None, None) => {}
            (Some(_), None) => return Err(StorageError::OrderExists(order.order_id.clone())),
            (None, Some(_)) => return Err(StorageError::OrderNotFound(order.order_id.clone())),
            (Some(stored), Some(expected)) => {
                if stored.version != expected {
                    return Err(StorageError::VersionConflict {
                        order_id: order.order_id.clone(),
                        expected,
                        actual: stored.version,
                    });
                }
            }
        }

        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(order)?;
            table.insert(order.order_id.as_str(), value.as_slice())?;
        }

        if order.is_open() {
            self.mark_order_active(txn, &order.order_id)?;
        } else {
            self.mark_order_inactive(txn, &order.order_id)?;
        }
        Ok(())
    }

    /// Get all orders, oldest first
    pub fn get_all_orders(&self) -> StorageResult<Vec<OrderSnapshot>> {
        self.query_orders(&OrderFilter::default())
    }

    /// Query orders, oldest first
    pub fn query_orders(&self, filter: &OrderFilter) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: OrderSnapshot = serde_json::from_slice(value.value())?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.last_sequence.cmp(&b.last_sequence))
        });
        Ok(orders)
    }

    // ========== Active Orders ==========

    /// Mark an order as active
    pub fn mark_order_active(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.insert(order_id, ())?;
        Ok(())
    }

    /// Mark an order as inactive
    pub fn mark_order_inactive(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Check if an order is active
    pub fn is_order_active(&self, order_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        Ok(table.get(order_id)?.is_some())
    }

    /// Get all active order IDs
    pub fn get_active_order_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;

        let mut order_ids: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            order_ids.push(key.value().to_string());
        }

        Ok(order_ids)
    }

    /// Get all active orders, oldest first
    pub fn get_active_orders(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let active_table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in active_table.iter()? {
            let (key, _) = result?;
            if let Some(value) = orders_table.get(key.value())? {
                let order: OrderSnapshot = serde_json::from_slice(value.value())?;
                orders.push(order);
            }
        }

        orders.sort_by_key(|o| (o.created_at, o.last_sequence));
        Ok(orders)
    }

    // ========== Token Operations ==========

    /// Which open order holds `token` (within transaction)
    pub fn token_holder_txn(
        &self,
        txn: &WriteTransaction,
        token: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(TOKENS_TABLE)?;
        Ok(table.get(token)?.map(|guard| guard.value().to_string()))
    }

    /// Reserve a token for an order
    pub fn claim_token(
        &self,
        txn: &WriteTransaction,
        token: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TOKENS_TABLE)?;
        table.insert(token, order_id)?;
        Ok(())
    }

    /// Release a token, only if `order_id` still holds it
    pub fn release_token(
        &self,
        txn: &WriteTransaction,
        token: &str,
        order_id: &str,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(TOKENS_TABLE)?;
        let held_by_order = table
            .get(token)?
            .is_some_and(|guard| guard.value() == order_id);
        if held_by_order {
            table.remove(token)?;
        }
        Ok(held_by_order)
    }

    /// Number of tokens currently held
    pub fn held_token_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOKENS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Strike / Ban Operations ==========

    /// Get a customer's strike record
    pub fn get_strikes(&self, customer_id: &str) -> StorageResult<Option<StrikeRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STRIKES_TABLE)?;
        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a customer's strike record (within transaction)
    pub fn get_strikes_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
    ) -> StorageResult<Option<StrikeRecord>> {
        let table = txn.open_table(STRIKES_TABLE)?;
        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a strike record
    pub fn store_strikes(
        &self,
        txn: &WriteTransaction,
        record: &StrikeRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STRIKES_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.customer_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a customer's ban record (lapsed bans included)
    pub fn get_ban(&self, customer_id: &str) -> StorageResult<Option<BanRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANS_TABLE)?;
        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a customer's ban record (within transaction)
    pub fn get_ban_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
    ) -> StorageResult<Option<BanRecord>> {
        let table = txn.open_table(BANS_TABLE)?;
        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store (create or refresh) a ban
    pub fn store_ban(&self, txn: &WriteTransaction, ban: &BanRecord) -> StorageResult<()> {
        let mut table = txn.open_table(BANS_TABLE)?;
        let value = serde_json::to_vec(ban)?;
        table.insert(ban.customer_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get all ban records
    pub fn get_all_bans(&self) -> StorageResult<Vec<BanRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANS_TABLE)?;

        let mut bans = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            bans.push(serde_json::from_slice(value.value())?);
        }
        Ok(bans)
    }

    /// Delete a ban; returns whether one existed
    pub fn remove_ban(&self, customer_id: &str) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let existed = {
            let mut table = txn.open_table(BANS_TABLE)?;
            table.remove(customer_id)?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    /// Delete every ban; returns how many were removed
    pub fn remove_all_bans(&self) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let removed = {
            let mut table = txn.open_table(BANS_TABLE)?;
            let mut keys: Vec<String> = Vec::new();
            for result in table.iter()? {
                let (key, _) = result?;
                keys.push(key.value().to_string());
            }
            for key in &keys {
                table.remove(key.as_str())?;
            }
            keys.len()
        };
        txn.commit()?;
        Ok(removed)
    }

    // ========== Settings ==========

    /// Read settings (defaults when never written)
    pub fn get_settings(&self) -> StorageResult<SystemSettings> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        match table.get(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(SystemSettings::default()),
        }
    }

    /// Read settings (within transaction)
    pub fn get_settings_txn(&self, txn: &WriteTransaction) -> StorageResult<SystemSettings> {
        let table = txn.open_table(SETTINGS_TABLE)?;
        match table.get(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(SystemSettings::default()),
        }
    }

    /// Write `defaults` unless settings were stored before; returns what is stored
    pub fn ensure_settings(&self, defaults: &SystemSettings) -> StorageResult<SystemSettings> {
        let txn = self.begin_write()?;
        let settings = {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let existing: Option<SystemSettings> = match table.get(SETTINGS_KEY)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            match existing {
                Some(settings) => settings,
                None => {
                    let value = serde_json::to_vec(defaults)?;
                    table.insert(SETTINGS_KEY, value.as_slice())?;
                    defaults.clone()
                }
            }
        };
        txn.commit()?;
        Ok(settings)
    }

    /// Read-modify-write the settings in one transaction
    pub fn update_settings<F>(&self, f: F) -> StorageResult<SystemSettings>
    where
        F: FnOnce(&mut SystemSettings),
    {
        let txn = self.begin_write()?;
        let mut settings = self.get_settings_txn(&txn)?;
        f(&mut settings);
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let value = serde_json::to_vec(&settings)?;
            table.insert(SETTINGS_KEY, value.as_slice())?;
        }
        txn.commit()?;
        Ok(settings)
    }

    // ========== Stats ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let active = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let events = read_txn.open_table(EVENTS_TABLE)?;
        let bans = read_txn.open_table(BANS_TABLE)?;
        let sequence = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            order_count: orders.len()?,
            active_order_count: active.len()?,
            event_count: events.len()?,
            ban_count: bans.len()?,
            current_sequence: sequence
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{
        Actor, EventPayload, OrderEventType, OrderItemSnapshot, PaymentStatus,
    };

    fn create_test_event(order_id: &str, sequence: u64) -> OrderEvent {
        OrderEvent::new(
            sequence,
            order_id.to_string(),
            sequence,
            1_700_000_000_000,
            Actor::Vendor,
            OrderEventType::OrderPaymentChanged,
            EventPayload::OrderPaymentChanged {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Paid,
            },
        )
    }

    fn create_test_order(order_id: &str) -> OrderSnapshot {
        let mut order = OrderSnapshot::new(order_id.to_string());
        order.token = "R-101".to_string();
        order.customer_id = "cust-1".to_string();
        order.customer_name = "Asha".to_string();
        order.items = vec![OrderItemSnapshot {
            menu_item_id: "burger".to_string(),
            name: "Burger".to_string(),
            unit_price: Decimal::from(85),
            quantity: 1,
        }];
        order.total_amount = Decimal::from(85);
        order
    }

    fn save(storage: &OrderStorage, order: &OrderSnapshot, expected: Option<u64>) -> StorageResult<()> {
        let txn = storage.begin_write()?;
        storage.save_order(&txn, order, expected)?;
        txn.commit()?;
        Ok(())
    }

    #[test]
    fn test_sequence_counter() {
        let storage = OrderStorage::open_in_memory().unwrap();
        assert_eq!(storage.get_current_sequence().unwrap(), 0);

        let txn = storage.begin_write().unwrap();
        storage.set_sequence(&txn, 5).unwrap();
        assert_eq!(storage.get_current_sequence_txn(&txn).unwrap(), 5);
        // Not visible to readers before commit
        assert_eq!(storage.get_current_sequence().unwrap(), 0);
        txn.commit().unwrap();

        assert_eq!(storage.get_current_sequence().unwrap(), 5);
    }

    #[test]
    fn test_event_storage() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = "order-1";

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &create_test_event(order_id, 2)).unwrap();
        storage.store_event(&txn, &create_test_event(order_id, 1)).unwrap();
        storage.store_event(&txn, &create_test_event("order-2", 3)).unwrap();
        txn.commit().unwrap();

        let events = storage.get_events_for_order(order_id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);

        let since = storage.get_events_since(1).unwrap();
        assert_eq!(since.len(), 2);
        assert!(since.iter().all(|e| e.sequence > 1));
    }

    #[test]
    fn test_save_order_compare_and_swap() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let mut order = create_test_order("order-1");

        save(&storage, &order, None).unwrap();
        assert!(matches!(
            save(&storage, &order, None),
            Err(StorageError::OrderExists(_))
        ));

        order.version = 1;
        save(&storage, &order, Some(0)).unwrap();

        // Stale writer
        order.version = 1;
        let err = save(&storage, &order, Some(0)).unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));

        assert_eq!(storage.get_order("order-1").unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_save_missing_order_with_version() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order = create_test_order("ghost");
        assert!(matches!(
            save(&storage, &order, Some(0)),
            Err(StorageError::OrderNotFound(_))
        ));
    }

    #[test]
    fn test_active_index_follows_status() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let mut order = create_test_order("order-1");

        save(&storage, &order, None).unwrap();
        assert!(storage.is_order_active("order-1").unwrap());
        assert_eq!(storage.get_active_orders().unwrap().len(), 1);

        order.status = OrderStatus::Delivered;
        order.version = 1;
        save(&storage, &order, Some(0)).unwrap();
        assert!(!storage.is_order_active("order-1").unwrap());
        assert!(storage.get_active_order_ids().unwrap().is_empty());

        order.status = OrderStatus::Ready;
        order.version = 2;
        save(&storage, &order, Some(1)).unwrap();
        assert!(storage.is_order_active("order-1").unwrap());
    }

    #[test]
    fn test_query_orders() {
        let storage = OrderStorage::open_in_memory().unwrap();

        let mut a = create_test_order("a");
        a.created_at = 1;
        let mut b = create_test_order("b");
        b.created_at = 2;
        b.customer_id = "cust-2".to_string();
        b.status = OrderStatus::Cancelled;
        save(&storage, &b, None).unwrap();
        save(&storage, &a, None).unwrap();

        let all = storage.get_all_orders().unwrap();
        assert_eq!(
            all.iter().map(|o| o.order_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let mine = storage.query_orders(&OrderFilter::customer("cust-2")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order_id, "b");

        let active = storage
            .query_orders(&OrderFilter {
                active_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].order_id, "a");

        let cancelled = storage
            .query_orders(&OrderFilter {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cancelled.len(), 1);
    }

    #[test]
    fn test_token_claim_and_release() {
        let storage = OrderStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.claim_token(&txn, "R-101", "order-1").unwrap();
        assert_eq!(
            storage.token_holder_txn(&txn, "R-101").unwrap().as_deref(),
            Some("order-1")
        );
        // Only the holder can release
        assert!(!storage.release_token(&txn, "R-101", "order-2").unwrap());
        assert!(storage.release_token(&txn, "R-101", "order-1").unwrap());
        assert!(storage.token_holder_txn(&txn, "R-101").unwrap().is_none());
        txn.commit().unwrap();

        assert_eq!(storage.held_token_count().unwrap(), 0);
    }

    #[test]
    fn test_ban_storage() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let ban = BanRecord {
            customer_id: "cust-1".to_string(),
            customer_name: "Asha".to_string(),
            cancellation_strikes: 3,
            ban_reason: "test".to_string(),
            banned_at: 0,
            ban_expires_at: 10,
        };

        let txn = storage.begin_write().unwrap();
        storage.store_ban(&txn, &ban).unwrap();
        storage
            .store_ban(
                &txn,
                &BanRecord {
                    customer_id: "cust-2".to_string(),
                    ..ban.clone()
                },
            )
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_ban("cust-1").unwrap(), Some(ban));
        assert!(storage.remove_ban("cust-1").unwrap());
        assert!(!storage.remove_ban("cust-1").unwrap());
        assert_eq!(storage.remove_all_bans().unwrap(), 1);
        assert!(storage.get_all_bans().unwrap().is_empty());
    }

    #[test]
    fn test_settings_default_and_update() {
        let storage = OrderStorage::open_in_memory().unwrap();
        assert_eq!(storage.get_settings().unwrap(), SystemSettings::default());

        let updated = storage.update_settings(|s| s.is_shop_open = false).unwrap();
        assert!(!updated.is_shop_open);
        assert!(!storage.get_settings().unwrap().is_shop_open);
    }

    #[test]
    fn test_ensure_settings_only_seeds_once() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let seeded = SystemSettings {
            cancellation_threshold: 5,
            ..Default::default()
        };
        assert_eq!(storage.ensure_settings(&seeded).unwrap(), seeded);

        storage.update_settings(|s| s.cancellation_threshold = 2).unwrap();
        let again = storage.ensure_settings(&seeded).unwrap();
        assert_eq!(again.cancellation_threshold, 2);
    }

    #[test]
    fn test_reopen_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");

        {
            let storage = OrderStorage::open(&path).unwrap();
            save(&storage, &create_test_order("order-1"), None).unwrap();
        }

        let storage = OrderStorage::open(&path).unwrap();
        assert!(storage.get_order("order-1").unwrap().is_some());
        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.order_count, 1);
        assert_eq!(stats.active_order_count, 1);
    }
}
