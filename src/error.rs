use thiserror::Error;

use crate::construct::Kind;

#[derive(Error, Debug)]
pub enum FieldkeeperError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("No {kind} with id {id}")]
    NotFound { kind: Kind, id: i64 },
    #[error("Invalid scope: {0}")]
    InvalidScope(String),
    #[error("Invalid target: {target} is not in the same scope as {id}")]
    InvalidTarget { id: i64, target: i64 },
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Partial write failure: {kind} {id} could not be repositioned")]
    PartialWriteFailure { kind: Kind, id: i64 },
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),
    #[error("Invalid field: {0}")]
    InvalidField(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl FieldkeeperError {
    /// Errors for which re-running the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification(_) | Self::PartialWriteFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FieldkeeperError>;

// Helper conversions
impl From<rusqlite::Error> for FieldkeeperError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                Self::ConcurrentModification(e.to_string())
            }
            _ => Self::Persistence(e.to_string()),
        }
    }
}
impl From<config::ConfigError> for FieldkeeperError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for FieldkeeperError {
    fn from(e: serde_json::Error) -> Self { Self::InvalidField(e.to_string()) }
}
