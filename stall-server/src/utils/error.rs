//! 统一错误处理
//!
//! 提供 HTTP 层错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误码规范
//!
//! 订单命令的错误直接使用 [`CommandErrorCode`] 的线上名称
//! (`CONCURRENT_MODIFICATION` 等)，其余沿用 `Exxxx`：
//!
//! | 错误码 | 说明 |
//! |--------|------|
//! | E0000 | 成功 |
//! | E0002 | 验证失败 |
//! | E0003 | 资源不存在 |
//! | E0006 | 无效请求 |
//! | E9001 | 内部错误 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::order::{CommandError, CommandErrorCode};
use tracing::error;

use crate::orders::ManagerError;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码 (E0000 表示成功)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 出错字段 / 状态 (订单命令错误)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 订单命令被拒绝 (状态码由错误码决定)
    #[error("{0}")]
    Command(CommandError),

    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),

    #[error("Invalid request: {0}")]
    /// 无效请求 (400)
    Invalid(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// HTTP status for an order command error code
pub fn command_status(code: CommandErrorCode) -> StatusCode {
    match code {
        CommandErrorCode::ShopClosed | CommandErrorCode::CustomerBanned => StatusCode::FORBIDDEN,
        CommandErrorCode::InvalidItems => StatusCode::BAD_REQUEST,
        CommandErrorCode::InvalidTransition | CommandErrorCode::ConcurrentModification => {
            StatusCode::CONFLICT
        }
        CommandErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        CommandErrorCode::NotFound => StatusCode::NOT_FOUND,
        CommandErrorCode::StorageUnavailable | CommandErrorCode::TokenPoolExhausted => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CommandErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn wire_code(code: CommandErrorCode) -> String {
    serde_json::to_value(code)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{code:?}"))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Command(err) => {
                let status = command_status(err.code);
                if status.is_server_error() {
                    error!(target: "orders", code = ?err.code, error = %err.message, "Order command failed");
                }
                (status, wire_code(err.code), err.message, err.details)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003".to_string(), msg, None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002".to_string(), msg, None),
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001".to_string(),
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, "E0006".to_string(), msg, None),
        };

        let body = Json(AppResponse::<()> {
            code,
            message,
            data: None,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ManagerError> for AppError {
    fn from(e: ManagerError) -> Self {
        AppError::Command(e.into())
    }
}

impl From<CommandError> for AppError {
    fn from(e: CommandError) -> Self {
        AppError::Command(e)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {e}"))
    }
}

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
        details: None,
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: message.into(),
        data: Some(data),
        details: None,
    })
}
