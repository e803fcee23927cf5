use crate::orders::storage::StorageError;
use crate::orders::traits::OrderError;
use shared::order::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Storage(e) => {
                tracing::error!(error = %e, "storage error during command processing");
                CommandError::new(CommandErrorCode::InternalError, e.to_string())
            }
            EngineError::Order(e) => CommandError::new(e.code(), e.to_string()),
        }
    }
}
