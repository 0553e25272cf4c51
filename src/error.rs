use crate::llm::LlmError;
use crate::storage::StorageError;
use std::time::Duration;

/// Every failure a command can end in. All of them are turned into a reply
/// by the command service; none of them is fatal.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("key '{0}' not found")]
    NotFound(String),
    #[error("key '{0}' already exists")]
    AlreadyExists(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("rate limited, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error(transparent)]
    Backend(#[from] LlmError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StorageError> for BotError {
    fn from(err: StorageError) -> Self {
        BotError::Persistence(err.to_string())
    }
}

impl BotError {
    /// Failures that only the requester should see.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            BotError::PermissionDenied | BotError::RateLimited { .. } | BotError::Backend(_)
        )
    }
}
