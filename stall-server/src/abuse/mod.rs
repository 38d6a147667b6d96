//! Anti-abuse guard
//!
//! Counts order cancellations per customer and bans repeat offenders.
//!
//! - Strikes are lifetime counters ([`StrikeRecord`]); lifting a ban never
//!   resets them, so the next cancellation after an unban re-bans at once.
//! - Bans expire lazily: a [`BanRecord`] stays on disk after it lapses and is
//!   simply ignored once `now >= ban_expires_at`.
//! - When the ban system is switched off, nobody is considered banned but
//!   strikes keep accumulating.

use redb::WriteTransaction;
use shared::models::{BanRecord, CANCELLATION_BAN_REASON, StrikeRecord};

use crate::orders::storage::{OrderStorage, StorageResult};
use crate::utils::SharedClock;

/// Result of recording one cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrikeOutcome {
    pub strikes: u32,
    /// Set when this strike issued or refreshed a ban
    pub ban: Option<BanRecord>,
}

/// Strike counter and ban registry
#[derive(Debug, Clone)]
pub struct AbuseGuard {
    storage: OrderStorage,
    clock: SharedClock,
}

impl AbuseGuard {
    pub fn new(storage: OrderStorage, clock: SharedClock) -> Self {
        Self { storage, clock }
    }

    /// Record a cancellation inside the cancelling order's transaction
    ///
    /// Once strikes reach the configured threshold the ban is created, or
    /// refreshed to a full duration from `now` if one already exists.
    pub fn record_cancellation(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
        customer_name: &str,
        now: i64,
    ) -> StorageResult<StrikeOutcome> {
        let settings = self.storage.get_settings_txn(txn)?;

        let mut record = self
            .storage
            .get_strikes_txn(txn, customer_id)?
            .unwrap_or_else(|| StrikeRecord {
                customer_id: customer_id.to_string(),
                ..Default::default()
            });
        record.strikes += 1;
        record.customer_name = customer_name.to_string();
        record.last_strike_at = now;
        self.storage.store_strikes(txn, &record)?;

        if record.strikes < settings.cancellation_threshold {
            tracing::info!(
                customer_id = %customer_id,
                strikes = record.strikes,
                threshold = settings.cancellation_threshold,
                "Cancellation strike recorded"
            );
            return Ok(StrikeOutcome {
                strikes: record.strikes,
                ban: None,
            });
        }

        let ban = BanRecord {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            cancellation_strikes: record.strikes,
            ban_reason: CANCELLATION_BAN_REASON.to_string(),
            banned_at: now,
            ban_expires_at: now.saturating_add(settings.ban_duration_millis()),
        };
        self.storage.store_ban(txn, &ban)?;

        tracing::warn!(
            customer_id = %customer_id,
            strikes = record.strikes,
            ban_expires_at = ban.ban_expires_at,
            "Customer banned for repeated cancellations"
        );

        Ok(StrikeOutcome {
            strikes: record.strikes,
            ban: Some(ban),
        })
    }

    /// The ban currently in force, if any
    ///
    /// Settings, the ban record and `now` are read once per call so the
    /// answer is consistent for that instant.
    pub fn active_ban(&self, customer_id: &str) -> StorageResult<Option<BanRecord>> {
        let settings = self.storage.get_settings()?;
        if !settings.is_ban_system_active {
            return Ok(None);
        }
        let now = self.clock.now_millis();
        Ok(self
            .storage
            .get_ban(customer_id)?
            .filter(|ban| ban.is_active_at(now)))
    }

    pub fn is_banned(&self, customer_id: &str) -> StorageResult<bool> {
        Ok(self.active_ban(customer_id)?.is_some())
    }

    /// Raw ban record (lapsed bans included)
    pub fn get_ban(&self, customer_id: &str) -> StorageResult<Option<BanRecord>> {
        self.storage.get_ban(customer_id)
    }

    /// Bans still in force, soonest expiry first
    pub fn list_active_bans(&self) -> StorageResult<Vec<BanRecord>> {
        let now = self.clock.now_millis();
        let mut bans: Vec<BanRecord> = self
            .storage
            .get_all_bans()?
            .into_iter()
            .filter(|ban| ban.is_active_at(now))
            .collect();
        bans.sort_by_key(|ban| ban.ban_expires_at);
        Ok(bans)
    }

    /// Lifetime cancellation count
    pub fn strikes(&self, customer_id: &str) -> StorageResult<u32> {
        Ok(self
            .storage
            .get_strikes(customer_id)?
            .map(|record| record.strikes)
            .unwrap_or(0))
    }

    /// Lift a ban; strikes are kept. Returns whether a ban existed.
    pub fn unban(&self, customer_id: &str) -> StorageResult<bool> {
        let removed = self.storage.remove_ban(customer_id)?;
        if removed {
            tracing::info!(customer_id = %customer_id, "Customer unbanned");
        }
        Ok(removed)
    }

    /// Lift every ban; returns how many were removed
    pub fn unban_all(&self) -> StorageResult<usize> {
        let removed = self.storage.remove_all_bans()?;
        tracing::info!(removed, "All bans lifted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use std::sync::Arc;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn create_guard() -> (AbuseGuard, Arc<ManualClock>) {
        let storage = OrderStorage::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(1_000_000));
        (AbuseGuard::new(storage, clock.clone()), clock)
    }

    fn cancel(guard: &AbuseGuard, customer_id: &str) -> StrikeOutcome {
        let txn = guard.storage.begin_write().unwrap();
        let now = guard.clock.now_millis();
        let outcome = guard
            .record_cancellation(&txn, customer_id, "Asha", now)
            .unwrap();
        txn.commit().unwrap();
        outcome
    }

    #[test]
    fn test_third_strike_bans() {
        let (guard, _clock) = create_guard();

        assert!(cancel(&guard, "c1").ban.is_none());
        assert!(cancel(&guard, "c1").ban.is_none());
        assert!(!guard.is_banned("c1").unwrap());

        let outcome = cancel(&guard, "c1");
        let ban = outcome.ban.unwrap();
        assert_eq!(outcome.strikes, 3);
        assert_eq!(ban.ban_reason, "Exceeded cancellation limit");
        assert_eq!(ban.ban_expires_at - ban.banned_at, HOUR_MS);
        assert!(guard.is_banned("c1").unwrap());
        assert!(!guard.is_banned("c2").unwrap());
    }

    #[test]
    fn test_ban_lapses_lazily() {
        let (guard, clock) = create_guard();
        for _ in 0..3 {
            cancel(&guard, "c1");
        }

        clock.advance_millis(HOUR_MS - 1);
        assert!(guard.is_banned("c1").unwrap());

        clock.advance_millis(1);
        assert!(!guard.is_banned("c1").unwrap());
        assert!(guard.list_active_bans().unwrap().is_empty());
        // Record kept until lifted
        assert!(guard.get_ban("c1").unwrap().is_some());
    }

    #[test]
    fn test_strikes_survive_unban() {
        let (guard, _clock) = create_guard();
        for _ in 0..3 {
            cancel(&guard, "c1");
        }
        assert!(guard.unban("c1").unwrap());
        assert!(!guard.is_banned("c1").unwrap());
        assert_eq!(guard.strikes("c1").unwrap(), 3);
        assert!(!guard.unban("c1").unwrap());

        // Next cancellation bans again immediately
        let outcome = cancel(&guard, "c1");
        assert_eq!(outcome.strikes, 4);
        assert!(outcome.ban.is_some());
    }

    #[test]
    fn test_further_strike_refreshes_ban() {
        let (guard, clock) = create_guard();
        for _ in 0..3 {
            cancel(&guard, "c1");
        }
        let first = guard.get_ban("c1").unwrap().unwrap();

        clock.advance_secs(600);
        cancel(&guard, "c1");
        let refreshed = guard.get_ban("c1").unwrap().unwrap();
        assert_eq!(refreshed.banned_at, first.banned_at + 600_000);
        assert_eq!(refreshed.cancellation_strikes, 4);
    }

    #[test]
    fn test_disabled_system_bans_nobody_but_counts() {
        let (guard, _clock) = create_guard();
        guard
            .storage
            .update_settings(|s| s.is_ban_system_active = false)
            .unwrap();

        for _ in 0..3 {
            cancel(&guard, "c1");
        }
        assert!(!guard.is_banned("c1").unwrap());
        assert_eq!(guard.strikes("c1").unwrap(), 3);

        guard
            .storage
            .update_settings(|s| s.is_ban_system_active = true)
            .unwrap();
        assert!(guard.is_banned("c1").unwrap());
    }

    #[test]
    fn test_threshold_from_settings() {
        let (guard, _clock) = create_guard();
        guard
            .storage
            .update_settings(|s| s.cancellation_threshold = 1)
            .unwrap();
        assert!(cancel(&guard, "c1").ban.is_some());
    }

    #[test]
    fn test_unban_all() {
        let (guard, _clock) = create_guard();
        for customer in ["c1", "c2"] {
            for _ in 0..3 {
                cancel(&guard, customer);
            }
        }
        assert_eq!(guard.list_active_bans().unwrap().len(), 2);
        assert_eq!(guard.unban_all().unwrap(), 2);
        assert!(guard.list_active_bans().unwrap().is_empty());
        assert_eq!(guard.strikes("c2").unwrap(), 3);
    }
}
