//! Observer sessions over the change bus
//!
//! A [`SyncSession`] keeps a local copy of every order in its scope and
//! hands its consumer whole orders, never deltas.
//!
//! # Protocol
//!
//! 1. Subscribe to the bus, then load the scope from storage (no gap)
//! 2. For each notification: `version <= last_seen` is dropped, newer
//!    replaces the local copy and is yielded
//! 3. If the receiver lagged, reload the scope from storage and yield
//!    whatever moved (full-sync fallback)
//! 4. `resync()` is the pull path: re-fetch and diff, idempotent
//!
//! # Guarantees
//!
//! - Per order, yielded versions strictly increase
//! - Duplicate or out-of-order deliveries are absorbed
//! - Dropping a session touches nothing but its own receiver

use std::collections::{HashMap, VecDeque};

use futures::Stream;
use shared::order::{OrderSnapshot, SubscriptionScope};

use super::storage::{OrderStorage, StorageResult};
use crate::bus::{BusRecvError, ChangeBus, ScopedReceiver};

/// Per-observer reconciling view of the orders in one scope
pub struct SyncSession {
    receiver: ScopedReceiver,
    storage: OrderStorage,
    cache: HashMap<String, OrderSnapshot>,
    /// Updates found by catch-up, waiting to be yielded
    pending: VecDeque<OrderSnapshot>,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("scope", self.receiver.scope())
            .field("cached_orders", &self.cache.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl SyncSession {
    /// Subscribe then seed from storage
    pub fn open(
        bus: &ChangeBus,
        storage: OrderStorage,
        scope: SubscriptionScope,
    ) -> StorageResult<Self> {
        let receiver = bus.subscribe(scope);
        let mut session = Self {
            receiver,
            storage,
            cache: HashMap::new(),
            pending: VecDeque::new(),
        };
        for order in session.load_scope()? {
            session.cache.insert(order.order_id.clone(), order);
        }
        tracing::debug!(scope = ?session.scope(), orders = session.cache.len(), "Sync session opened");
        Ok(session)
    }

    pub fn scope(&self) -> &SubscriptionScope {
        self.receiver.scope()
    }

    /// Local copy of one order
    pub fn order(&self, order_id: &str) -> Option<&OrderSnapshot> {
        self.cache.get(order_id)
    }

    /// All orders in view, oldest first
    pub fn orders(&self) -> Vec<OrderSnapshot> {
        let mut orders: Vec<OrderSnapshot> = self.cache.values().cloned().collect();
        orders.sort_by_key(|o| (o.created_at, o.last_sequence));
        orders
    }

    pub fn last_seen_version(&self, order_id: &str) -> Option<u64> {
        self.cache.get(order_id).map(|o| o.version)
    }

    /// Offer an order to the local view; true if it was newer and replaced it
    pub fn reconcile(&mut self, order: &OrderSnapshot) -> bool {
        if !self.scope().matches(&order.order_id) {
            return false;
        }
        match self.cache.get(&order.order_id) {
            Some(seen) if order.version <= seen.version => false,
            _ => {
                self.cache.insert(order.order_id.clone(), order.clone());
                true
            }
        }
    }

    /// Wait for the next newer order in scope
    ///
    /// Returns `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<OrderSnapshot> {
        loop {
            if let Some(order) = self.pending.pop_front() {
                return Some(order);
            }

            match self.receiver.recv().await {
                Ok(notification) => {
                    if self.reconcile(&notification.order) {
                        return Some(notification.order.clone());
                    }
                }
                Err(BusRecvError::Lagged(skipped)) => {
                    tracing::warn!(scope = ?self.scope(), skipped, "Sync session lagged, catching up from storage");
                    self.catch_up().await;
                }
                Err(BusRecvError::Closed) => return None,
            }
        }
    }

    /// Pull path: reload the scope and return the orders that moved forward
    pub fn resync(&mut self) -> StorageResult<Vec<OrderSnapshot>> {
        let mut changed = Vec::new();
        for order in self.load_scope()? {
            if self.reconcile(&order) {
                changed.push(order);
            }
        }
        Ok(changed)
    }

    /// Reload the scope on the blocking pool and queue what moved forward
    async fn catch_up(&mut self) {
        let storage = self.storage.clone();
        let scope = self.scope().clone();
        match tokio::task::spawn_blocking(move || load_scope(&storage, &scope)).await {
            Ok(Ok(orders)) => {
                for order in orders {
                    if self.reconcile(&order) {
                        self.pending.push_back(order);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Catch-up failed, continuing with live updates");
            }
            Err(e) => {
                tracing::error!(error = %e, "Catch-up task failed, continuing with live updates");
            }
        }
    }

    /// Stream of materialized orders
    pub fn into_stream(self) -> impl Stream<Item = OrderSnapshot> + Send {
        futures::stream::unfold(self, |mut session| async move {
            session.next().await.map(|order| (order, session))
        })
    }

    fn load_scope(&self) -> StorageResult<Vec<OrderSnapshot>> {
        load_scope(&self.storage, self.scope())
    }
}

fn load_scope(storage: &OrderStorage, scope: &SubscriptionScope) -> StorageResult<Vec<OrderSnapshot>> {
    match scope {
        SubscriptionScope::Order { order_id } => {
            Ok(storage.get_order(order_id)?.into_iter().collect())
        }
        SubscriptionScope::All => storage.get_all_orders(),
    }
}
