pub mod documents;
pub mod kv;
pub mod workflow;

pub use documents::*;
pub use kv::*;
pub use workflow::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Distinguished from generic storage errors so the operator-facing
    /// message can say "free up space" instead of a generic failure.
    #[error("Storage quota exceeded — free up disk space and retry")]
    QuotaExceeded,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Required identifier missing: {0}")]
    MissingIdentifier(String),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid workflow transition: {from} → {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Map an SQLite failure, surfacing disk-full as the quota variant.
pub(crate) fn map_sqlite_error(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ffi_error, _) = &e {
        if ffi_error.code == rusqlite::ErrorCode::DiskFull {
            return StoreError::QuotaExceeded;
        }
    }
    StoreError::Sqlite(e)
}
