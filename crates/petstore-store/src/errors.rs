//! Error handling for petstore-store
//!
//! Connection and migration failures use the canonical `ExError`. Failures
//! inside a unit of work surface as `PetStoreError::Backend` so the
//! coordinator can attribute them to the entity being written.

use petstore_core::errors::{ExError, ExErrorKind, PetStoreError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration whose embedded SQL no longer matches its record
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::IntegrityViolation)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Backend failure reported across the `UnitOfWork` boundary
pub fn backend_error(op: &str, err: rusqlite::Error) -> PetStoreError {
    PetStoreError::Backend {
        op: op.to_string(),
        message: err.to_string(),
    }
}
