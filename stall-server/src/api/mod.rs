//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单命令、查询和推送流
//! - [`admin`] - 商家设置与封禁管理

pub mod admin;
pub mod health;
pub mod orders;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;
use crate::orders::{ManagerResult, OrdersManager};

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResponse, AppResult};

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(admin::router())
}

/// Build the fully configured application
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}

/// Run a manager call on the blocking pool
///
/// Manager methods do synchronous redb I/O.
pub(crate) async fn run_blocking<T, F>(state: &ServerState, f: F) -> AppResult<T>
where
    F: FnOnce(&OrdersManager) -> ManagerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let manager = state.orders.clone();
    Ok(tokio::task::spawn_blocking(move || f(&manager)).await??)
}
