//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//! | /health/detailed | GET | 详细健康检查 (存储统计、订阅数) |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::orders::storage::StorageStats;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// 服务实例 ID，变化说明服务已重启，客户端应全量同步
    epoch: String,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    epoch: String,
    uptime_seconds: u64,
    shop_open: bool,
    subscribers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.orders.epoch().to_string(),
    })
}

/// 包含存储状态的详细健康检查
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let manager = state.orders.clone();
    let checked = tokio::task::spawn_blocking(move || {
        let stats = manager.storage().get_stats()?;
        let settings = manager.storage().get_settings()?;
        Ok::<_, crate::orders::StorageError>((stats, settings))
    })
    .await;

    let (storage, shop_open, error) = match checked {
        Ok(Ok((stats, settings))) => (Some(stats), settings.is_shop_open, None),
        Ok(Err(e)) => (None, false, Some(e.to_string())),
        Err(e) => (None, false, Some(e.to_string())),
    };

    Json(DetailedHealthResponse {
        status: if error.is_none() { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.orders.epoch().to_string(),
        uptime_seconds: state.uptime().as_secs(),
        shop_open,
        subscribers: state.orders.bus().subscriber_count(),
        storage,
        error,
    })
}
