//! # Store Error Types
//!
//! Error types for record store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (garage-core)        lock / io / toml / json failures        │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  StoreError (this module) ← Adds storage context                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UI collaborator: reverts optimistic state, shows message               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use garage_core::CoreError;
use thiserror::Error;

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A domain rule rejected the operation. The record is untouched.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - Unknown appointment or payment id
    /// - Well-formed tracking code that was never issued
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A writer panicked while holding a store lock.
    #[error("Record store lock poisoned")]
    LockPoisoned,

    /// A new record collided with an existing key.
    #[error("{entity} already exists: {id}")]
    Conflict { entity: String, id: String },

    /// shop.toml is unreadable or out of range.
    #[error("Invalid shop configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for a well-formed key with no record behind it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::Core(CoreError::NotFound { .. })
        )
    }

    /// True for a malformed tracking code.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, StoreError::Core(CoreError::InvalidFormat { .. }))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
