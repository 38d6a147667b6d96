use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::order::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Map storage failures onto wire codes
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::OrderNotFound(_) => CommandErrorCode::NotFound,
        StorageError::VersionConflict { .. } => CommandErrorCode::ConcurrentModification,
        StorageError::Serialization(_) | StorageError::OrderExists(_) => {
            CommandErrorCode::InternalError
        }
        // redb Database/Transaction/Table/Storage/Commit errors
        _ => CommandErrorCode::StorageUnavailable,
    }
}

impl ManagerError {
    pub fn code(&self) -> CommandErrorCode {
        match self {
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::Order(e) => e.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(StorageError::VersionConflict {
                order_id,
                expected,
                actual,
            }) => OrderError::ConcurrentModification {
                order_id,
                expected,
                actual,
            }
            .into(),
            ManagerError::Storage(StorageError::OrderNotFound(order_id)) => {
                OrderError::OrderNotFound(order_id).into()
            }
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                CommandError::new(code, e.to_string())
            }
            ManagerError::Order(e) => e.into(),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
