//! System Settings Model

use serde::{Deserialize, Serialize};

pub const DEFAULT_CANCELLATION_THRESHOLD: u32 = 3;
pub const DEFAULT_BAN_DURATION_SECS: u64 = 60 * 60;

/// Vendor-wide settings singleton (last writer wins)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemSettings {
    pub is_ban_system_active: bool,
    pub is_shop_open: bool,
    #[serde(default)]
    pub vendor_phone_number: String,
    /// Strikes needed before a ban is issued
    #[serde(default = "default_threshold")]
    pub cancellation_threshold: u32,
    /// How long an automatic ban lasts
    #[serde(default = "default_ban_duration")]
    pub ban_duration_secs: u64,
}

fn default_threshold() -> u32 {
    DEFAULT_CANCELLATION_THRESHOLD
}

fn default_ban_duration() -> u64 {
    DEFAULT_BAN_DURATION_SECS
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            is_ban_system_active: true,
            is_shop_open: true,
            vendor_phone_number: String::new(),
            cancellation_threshold: DEFAULT_CANCELLATION_THRESHOLD,
            ban_duration_secs: DEFAULT_BAN_DURATION_SECS,
        }
    }
}

impl SystemSettings {
    pub fn ban_duration_millis(&self) -> i64 {
        i64::try_from(self.ban_duration_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    /// Apply a partial update
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.is_ban_system_active {
            self.is_ban_system_active = v;
        }
        if let Some(v) = update.is_shop_open {
            self.is_shop_open = v;
        }
        if let Some(v) = update.vendor_phone_number {
            self.vendor_phone_number = v;
        }
        if let Some(v) = update.cancellation_threshold {
            // A zero threshold would ban on every order
            self.cancellation_threshold = v.max(1);
        }
        if let Some(v) = update.ban_duration_secs {
            self.ban_duration_secs = v;
        }
    }
}

/// Update settings payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub is_ban_system_active: Option<bool>,
    pub is_shop_open: Option<bool>,
    pub vendor_phone_number: Option<String>,
    pub cancellation_threshold: Option<u32>,
    pub ban_duration_secs: Option<u64>,
}
