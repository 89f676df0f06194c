//! Error types for the state store.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] and [`serde_json`] errors and adds the store-level failures
//! (version conflicts, missing or duplicate entities).

use garrison_types::EntityId;

/// Errors that can occur in the state store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another writer saved the entity since it was loaded.
    #[error("write conflict on entity {id}: expected version {expected}, found {found}")]
    Conflict {
        /// The entity being saved.
        id: EntityId,
        /// Version the writer loaded.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },

    /// The entity does not exist.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// An entity with this id already exists.
    #[error("entity already exists: {0}")]
    Duplicate(EntityId),

    /// A stored row could not be mapped back to a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A store call outlived the caller's deadline and was abandoned.
    #[error("store call {operation} timed out after {after_ms}ms")]
    Timeout {
        /// The abandoned call.
        operation: &'static str,
        /// The deadline that expired.
        after_ms: u64,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
