//! Error types for the flight currency engine.
//!
//! Errors are reserved for contract violations at the edges: malformed
//! definition sets on save, deletes blocked by referents, bad dates, and
//! storage failures. Data-shape problems found while walking a logic tree
//! are never errors; they surface as [`crate::logic::Diagnostic`] values.

/// Engine error types covering all fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum CurrencyError {
    #[error("Currency not found: {0}")]
    NotFound(String),

    #[error("Currency '{name}' ({id}) is in use by: {}", referenced_by.join(", "))]
    InUse {
        id: String,
        name: String,
        referenced_by: Vec<String>,
    },

    #[error("Duplicate currency id: {0}")]
    DuplicateId(String),

    #[error("Duplicate currency name: {0}")]
    DuplicateName(String),

    #[error("Invalid definition {id}: {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Edit to {id} would create a reference cycle: {}", path.join(" -> "))]
    CycleRejected { id: String, path: Vec<String> },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CurrencyError>;
