//! OrdersManager - Core command processing and event generation
//!
//! This module handles:
//! - Pre-transaction gates for new orders (shop open, ban, menu)
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional, version compare-and-swap)
//! - Token index and strike bookkeeping in the same transaction
//! - Publishing to the ChangeBus after commit
//!
//! # Command Flow
//!
//! ```text
//! process(action)
//!     ├─ 1. Take commit lock (bus order == commit order)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Execute action -> events
//!     ├─ 5. Apply events to snapshots via EventApplier
//!     ├─ 6. Persist events
//!     ├─ 7. Save snapshots (CAS on version), tokens, strikes
//!     ├─ 8. Persist sequence counter
//!     ├─ 9. Commit transaction
//!     └─ 10. Publish notifications
//! ```

mod error;
pub use error::*;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use redb::WriteTransaction;
use shared::models::{BanRecord, SettingsUpdate, SystemSettings};
use shared::order::{
    Actor, CreateOrderRequest, OrderEvent, OrderNotification, OrderSnapshot, OrderStatus,
    PaymentStatus, SubscriptionScope,
};

use super::actions::{
    CommandAction, CreateOrderAction, SetPaymentStatusAction, TransitionStatusAction,
};
use super::appliers::EventAction;
use super::reducer;
use super::storage::{OrderFilter, OrderStorage, StorageError, StorageResult};
use super::sync::SyncSession;
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier, OrderError};
use crate::abuse::AbuseGuard;
use crate::bus::{ChangeBus, ScopedReceiver};
use crate::services::MenuLookup;
use crate::utils::SharedClock;

/// OrdersManager for command processing
///
/// Cheap to clone; clones share storage, bus and locks. Methods do blocking
/// storage I/O, async callers go through `spawn_blocking`.
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger full resync.
#[derive(Clone)]
pub struct OrdersManager {
    storage: OrderStorage,
    bus: ChangeBus,
    abuse: AbuseGuard,
    menu: Arc<dyn MenuLookup>,
    clock: SharedClock,
    /// Held from begin_write to publish
    commit_lock: Arc<Mutex<()>>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("bus", &self.bus)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl OrdersManager {
    /// Create a new OrdersManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        menu: Arc<dyn MenuLookup>,
        clock: SharedClock,
    ) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        Ok(Self::with_storage(storage, menu, clock))
    }

    /// Create an OrdersManager with existing storage
    pub fn with_storage(storage: OrderStorage, menu: Arc<dyn MenuLookup>, clock: SharedClock) -> Self {
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "OrdersManager started with new epoch");
        Self {
            abuse: AbuseGuard::new(storage.clone(), clock.clone()),
            storage,
            bus: ChangeBus::default(),
            menu,
            clock,
            commit_lock: Arc::new(Mutex::new(())),
            epoch,
        }
    }

    /// Replace the change bus (custom capacity)
    pub fn with_bus(mut self, bus: ChangeBus) -> Self {
        self.bus = bus;
        self
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn abuse_guard(&self) -> &AbuseGuard {
        &self.abuse
    }

    // ========== Commands ==========

    /// Place a new order
    ///
    /// Gates run in order: shop open, customer not banned, items valid.
    pub fn create_order(&self, request: CreateOrderRequest) -> ManagerResult<OrderSnapshot> {
        let settings = self.storage.get_settings()?;
        if !settings.is_shop_open {
            return Err(OrderError::ShopClosed.into());
        }

        if let Some(ban) = self.abuse.active_ban(&request.customer_id)? {
            tracing::info!(customer_id = %request.customer_id, "Order rejected: customer banned");
            return Err(OrderError::CustomerBanned {
                customer_id: ban.customer_id,
                expires_at: ban.ban_expires_at,
            }
            .into());
        }

        let items = reducer::resolve_items(&request.items, self.menu.as_ref())?;

        let actor = Actor::customer(request.customer_id.clone());
        let action = CreateOrderAction {
            order_id: uuid::Uuid::new_v4().to_string(),
            customer_id: request.customer_id,
            customer_name: request.customer_name,
            items,
            payment_method: request.payment_method,
            order_type: request.order_type,
            delivery_details: request.delivery_details,
        };
        self.process(action.into(), actor)
    }

    /// Move an order to `to`, provided it is still at `expected_version`
    pub fn transition_status(
        &self,
        actor: Actor,
        order_id: &str,
        to: OrderStatus,
        expected_version: u64,
    ) -> ManagerResult<OrderSnapshot> {
        let action = TransitionStatusAction {
            order_id: order_id.to_string(),
            to,
            expected_version,
        };
        self.process(action.into(), actor)
    }

    /// Set the payment flag, provided the order is still at `expected_version`
    pub fn set_payment_status(
        &self,
        actor: Actor,
        order_id: &str,
        status: PaymentStatus,
        expected_version: u64,
    ) -> ManagerResult<OrderSnapshot> {
        let action = SetPaymentStatusAction {
            order_id: order_id.to_string(),
            status,
            expected_version,
        };
        self.process(action.into(), actor)
    }

    /// Run one command inside a single write transaction
    fn process(&self, action: CommandAction, actor: Actor) -> ManagerResult<OrderSnapshot> {
        tracing::debug!(command = action.name(), order_id = %action.order_id(), "Processing command");

        let _commit_guard = self.commit_lock.lock();

        let txn = self.storage.begin_write()?;
        let current_sequence = self.storage.get_current_sequence_txn(&txn)?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            actor,
            timestamp: self.clock.now_millis(),
        };

        let events = match futures::executor::block_on(action.execute(&mut ctx, &metadata)) {
            Ok(events) => events,
            Err(e) => {
                tracing::debug!(command = action.name(), order_id = %action.order_id(), error = %e, "Command rejected");
                return Err(e.into());
            }
        };

        // Apply events, remembering each order's state before the command
        let mut originals: HashMap<String, Option<OrderSnapshot>> = HashMap::new();
        let mut notifications = Vec::with_capacity(events.len());
        for event in &events {
            let previous = match ctx.load_snapshot(&event.order_id) {
                Ok(snapshot) => Some(snapshot),
                Err(OrderError::OrderNotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
            originals
                .entry(event.order_id.clone())
                .or_insert_with(|| previous.clone());

            let mut snapshot =
                previous.unwrap_or_else(|| OrderSnapshot::new(event.order_id.clone()));
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);

            notifications.push(OrderNotification {
                event: event.clone(),
                order: snapshot.clone(),
            });
            ctx.save_snapshot(snapshot);
        }

        for event in &events {
            self.storage.store_event(&txn, event)?;
        }

        for snapshot in ctx.modified_snapshots() {
            let original = originals.get(&snapshot.order_id).cloned().flatten();
            self.storage
                .save_order(&txn, snapshot, original.as_ref().map(|o| o.version))
                .map_err(OrderError::from)?;
            self.update_token_index(&txn, original.as_ref(), snapshot)?;

            let newly_cancelled =
                snapshot.is_cancelled() && original.as_ref().is_some_and(|o| !o.is_cancelled());
            if newly_cancelled {
                self.abuse.record_cancellation(
                    &txn,
                    &snapshot.customer_id,
                    &snapshot.customer_name,
                    metadata.timestamp,
                )?;
            }
        }

        self.storage.set_sequence(&txn, ctx.current_sequence())?;
        drop(ctx);

        txn.commit().map_err(StorageError::from)?;

        let result = notifications
            .last()
            .map(|n| n.order.clone())
            .ok_or_else(|| OrderError::Storage("command produced no events".to_string()))?;

        for notification in notifications {
            self.log_committed(&notification.event, &notification.order);
            self.bus.publish(notification);
        }

        Ok(result)
    }

    /// Keep the token index in step with which orders are open
    fn update_token_index(
        &self,
        txn: &WriteTransaction,
        original: Option<&OrderSnapshot>,
        snapshot: &OrderSnapshot,
    ) -> StorageResult<()> {
        let held = original.filter(|o| o.is_open());

        if let Some(before) = held
            && (!snapshot.is_open() || before.token != snapshot.token)
        {
            self.storage
                .release_token(txn, &before.token, &snapshot.order_id)?;
        }

        if snapshot.is_open() && !held.is_some_and(|b| b.token == snapshot.token) {
            self.storage
                .claim_token(txn, &snapshot.token, &snapshot.order_id)?;
        }
        Ok(())
    }

    fn log_committed(&self, event: &OrderEvent, order: &OrderSnapshot) {
        tracing::info!(
            order_id = %order.order_id,
            token = %order.token,
            event_type = %event.event_type,
            version = order.version,
            status = %order.status,
            payment_status = %order.payment_status,
            "Order change committed"
        );
    }

    // ========== Subscriptions ==========

    /// Open a reconciling session for `scope`
    pub fn subscribe(&self, scope: SubscriptionScope) -> ManagerResult<SyncSession> {
        Ok(SyncSession::open(&self.bus, self.storage.clone(), scope)?)
    }

    /// Raw notification receiver (no reconciliation)
    pub fn subscribe_changes(&self, scope: SubscriptionScope) -> ScopedReceiver {
        self.bus.subscribe(scope)
    }

    // ========== Administration ==========

    pub fn unban(&self, customer_id: &str) -> ManagerResult<bool> {
        Ok(self.abuse.unban(customer_id)?)
    }

    pub fn unban_all(&self) -> ManagerResult<usize> {
        Ok(self.abuse.unban_all()?)
    }

    pub fn toggle_ban_system(&self, active: bool) -> ManagerResult<SystemSettings> {
        tracing::info!(active, "Ban system toggled");
        Ok(self
            .storage
            .update_settings(|s| s.is_ban_system_active = active)?)
    }

    pub fn toggle_shop_open(&self, open: bool) -> ManagerResult<SystemSettings> {
        tracing::info!(open, "Shop open toggled");
        Ok(self.storage.update_settings(|s| s.is_shop_open = open)?)
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> ManagerResult<SystemSettings> {
        Ok(self.storage.update_settings(|s| s.apply(update))?)
    }

    pub fn get_settings(&self) -> ManagerResult<SystemSettings> {
        Ok(self.storage.get_settings()?)
    }

    pub fn is_banned(&self, customer_id: &str) -> ManagerResult<bool> {
        Ok(self.abuse.is_banned(customer_id)?)
    }

    pub fn get_ban(&self, customer_id: &str) -> ManagerResult<Option<BanRecord>> {
        Ok(self.abuse.get_ban(customer_id)?)
    }

    pub fn list_active_bans(&self) -> ManagerResult<Vec<BanRecord>> {
        Ok(self.abuse.list_active_bans()?)
    }

    pub fn strikes(&self, customer_id: &str) -> ManagerResult<u32> {
        Ok(self.abuse.strikes(customer_id)?)
    }

    // ========== Public Query Methods ==========

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> ManagerResult<Option<OrderSnapshot>> {
        Ok(self.storage.get_order(order_id)?)
    }

    pub fn query_orders(&self, filter: &OrderFilter) -> ManagerResult<Vec<OrderSnapshot>> {
        Ok(self.storage.query_orders(filter)?)
    }

    /// Get all open orders (the vendor queue), oldest first
    pub fn get_active_orders(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        Ok(self.storage.get_active_orders()?)
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Audit history of one order
    pub fn get_order_events(&self, order_id: &str) -> ManagerResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_for_order(order_id)?)
    }

    /// Rebuild an order from its events
    pub fn rebuild_order(&self, order_id: &str) -> ManagerResult<OrderSnapshot> {
        let (_, events) = self.storage.get_order_with_events(order_id)?;
        replay_events(order_id, &events)
    }

    /// Whether the stored snapshot matches a replay of its events
    ///
    /// Both come from one read transaction, so a concurrent commit never
    /// shows up as a mismatch.
    pub fn verify_order(&self, order_id: &str) -> ManagerResult<bool> {
        let (stored, events) = self.storage.get_order_with_events(order_id)?;
        let stored = stored.ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        let rebuilt = replay_events(order_id, &events)?;
        let consistent = stored == rebuilt;
        if !consistent {
            tracing::warn!(order_id = %order_id, "Stored order differs from event replay");
        }
        Ok(consistent)
    }
}

fn replay_events(order_id: &str, events: &[OrderEvent]) -> ManagerResult<OrderSnapshot> {
    reducer::replay(order_id, events)
        .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()).into())
}

#[cfg(test)]
mod tests;
