//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - HTTP 层错误类型
//! - [`Clock`] - 时间源 (可注入)
//! - 输入校验
//! - 日志初始化

pub mod clock;
pub mod error;
pub mod logger;
pub mod validation;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
