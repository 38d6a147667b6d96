//! Admin API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::models::{BanRecord, SettingsUpdate, SystemSettings};

use crate::api::run_blocking;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct ShopToggle {
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct BanSystemToggle {
    pub active: bool,
}

/// Ban state of one customer
#[derive(Debug, Serialize)]
pub struct BanStatus {
    pub customer_id: String,
    pub banned: bool,
    pub strikes: u32,
    /// Ban record in force, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban: Option<BanRecord>,
}

#[derive(Debug, Serialize)]
pub struct UnbanResult {
    pub removed: usize,
}

pub async fn get_settings(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<SystemSettings>>> {
    let settings = run_blocking(&state, |m| m.get_settings()).await?;
    Ok(ok(settings))
}

pub async fn update_settings(
    State(state): State<ServerState>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<AppResponse<SystemSettings>>> {
    let settings = run_blocking(&state, move |m| m.update_settings(update)).await?;
    Ok(ok(settings))
}

pub async fn toggle_shop(
    State(state): State<ServerState>,
    Json(toggle): Json<ShopToggle>,
) -> AppResult<Json<AppResponse<SystemSettings>>> {
    let settings = run_blocking(&state, move |m| m.toggle_shop_open(toggle.open)).await?;
    Ok(ok(settings))
}

pub async fn toggle_ban_system(
    State(state): State<ServerState>,
    Json(toggle): Json<BanSystemToggle>,
) -> AppResult<Json<AppResponse<SystemSettings>>> {
    let settings = run_blocking(&state, move |m| m.toggle_ban_system(toggle.active)).await?;
    Ok(ok(settings))
}

/// Bans still in force
pub async fn list_bans(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<BanRecord>>>> {
    let bans = run_blocking(&state, |m| m.list_active_bans()).await?;
    Ok(ok(bans))
}

pub async fn ban_status(
    State(state): State<ServerState>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<AppResponse<BanStatus>>> {
    let status = run_blocking(&state, move |m| {
        let ban = m.abuse_guard().active_ban(&customer_id)?;
        let strikes = m.strikes(&customer_id)?;
        Ok(BanStatus {
            banned: ban.is_some(),
            customer_id,
            strikes,
            ban,
        })
    })
    .await?;
    Ok(ok(status))
}

pub async fn unban(
    State(state): State<ServerState>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<AppResponse<UnbanResult>>> {
    let removed = run_blocking(&state, move |m| m.unban(&customer_id)).await?;
    let message = if removed { "Customer unbanned" } else { "No ban on record" };
    Ok(ok_with_message(
        UnbanResult {
            removed: usize::from(removed),
        },
        message,
    ))
}

pub async fn unban_all(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<UnbanResult>>> {
    let removed = run_blocking(&state, |m| m.unban_all()).await?;
    Ok(ok(UnbanResult { removed }))
}
