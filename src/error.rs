use std::sync::PoisonError;
use thiserror::Error;

/// Every outcome a slot backend reports besides success.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("slot already exists")]
    AlreadyExists,
    #[error("slot not found")]
    NotFound,
    #[error("slot already booked")]
    AlreadyBooked,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl SlotError {
    /// Machine-readable reason returned to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            SlotError::InvalidInput(_) => "invalid_input",
            SlotError::AlreadyExists => "already_exists",
            SlotError::NotFound => "not_found",
            SlotError::AlreadyBooked => "already_booked",
            SlotError::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<diesel::result::Error> for SlotError {
    fn from(err: diesel::result::Error) -> Self {
        SlotError::StorageUnavailable(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for SlotError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        SlotError::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for SlotError {
    fn from(err: std::io::Error) -> Self {
        SlotError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SlotError {
    fn from(err: serde_json::Error) -> Self {
        SlotError::StorageUnavailable(err.to_string())
    }
}

impl From<tempfile::PersistError> for SlotError {
    fn from(err: tempfile::PersistError) -> Self {
        SlotError::StorageUnavailable(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for SlotError {
    fn from(_: PoisonError<T>) -> Self {
        SlotError::StorageUnavailable("lock poisoned".into())
    }
}

impl From<validator::ValidationErrors> for SlotError {
    fn from(err: validator::ValidationErrors) -> Self {
        SlotError::InvalidInput(err.to_string())
    }
}
