use thiserror::Error;

use crate::orders::ManagerError;
use crate::orders::storage::StorageError;
use crate::services::MenuError;

/// 启动和运行期错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("订单管理器错误: {0}")]
    Manager(#[from] ManagerError),

    #[error("菜单加载失败: {0}")]
    Menu(#[from] MenuError),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

/// 服务器 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
