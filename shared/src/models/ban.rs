//! Ban Models
//!
//! Strikes and bans are stored separately: lifting a ban deletes the
//! [`BanRecord`] but the [`StrikeRecord`] keeps counting.

use serde::{Deserialize, Serialize};

/// Reason recorded on automatic bans
pub const CANCELLATION_BAN_REASON: &str = "Exceeded cancellation limit";

/// Active (or lapsed, not yet lifted) ban
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BanRecord {
    pub customer_id: String,
    pub customer_name: String,
    /// Strike count at the time the ban was (re)issued
    pub cancellation_strikes: u32,
    pub ban_reason: String,
    /// Unix millis
    pub banned_at: i64,
    /// Unix millis, exclusive
    pub ban_expires_at: i64,
}

impl BanRecord {
    /// Lazy expiry: a ban is in force only while `now < ban_expires_at`
    pub fn is_active_at(&self, now: i64) -> bool {
        now < self.ban_expires_at
    }

    /// Milliseconds left, zero once lapsed
    pub fn remaining_millis(&self, now: i64) -> i64 {
        (self.ban_expires_at - now).max(0)
    }
}

/// Lifetime cancellation counter for a customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StrikeRecord {
    pub customer_id: String,
    pub customer_name: String,
    pub strikes: u32,
    /// Unix millis of the most recent strike
    pub last_strike_at: i64,
}
