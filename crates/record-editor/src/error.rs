//! Edit Error Types

use data_validator::ValidationError;
use record_store::{RecordId, StorageError};
use thiserror::Error;

/// Errors returned by [`crate::RecordEditor`]
#[derive(Debug, Clone, Error)]
pub enum EditError {
    #[error("Record {0} not found")]
    NotFound(RecordId),

    /// Input rejected; nothing was changed
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The change is applied in memory but could not be persisted
    #[error("Change applied but not persisted: {0}")]
    Storage(#[from] StorageError),
}
