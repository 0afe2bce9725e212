//! # Error Types
//!
//! Domain-specific error types for garage-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  garage-core errors (this file)                                        │
//! │  ├── CoreError        - Tracking / lifecycle / money rule violations   │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  garage-store errors (separate crate)                                  │
//! │  └── StoreError       - Record store failures, wraps CoreError         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → UI collaborator      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//! - `InvalidFormat` / `InvalidAmount` are raised before any record is read.
//! - `IllegalTransition` / `NotFound` never leave a record half-updated.
//! - `GenerationExhausted` is the only degraded outcome: a fallback code
//!   still exists, but nobody may treat it as guaranteed unique.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A tracking code does not match `MC-YYYY-NNNNNN`.
    ///
    /// ## When This Occurs
    /// - Customer typed a code with a typo into the tracking portal
    /// - Lowercase prefix, missing hyphen, too few digits
    #[error("Invalid tracking code format: '{value}' (expected MC-YYYY-NNNNNN)")]
    InvalidFormat { value: String },

    /// A well-formed identifier with no matching record.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The status table does not allow this move.
    ///
    /// ## User Workflow
    /// ```text
    /// Admin clicks "Start work" on a completed job
    ///      │
    ///      ▼
    /// IllegalTransition { entity: "Appointment", from: "completed", to: "in_progress" }
    ///      │
    ///      ▼
    /// UI reverts its optimistic badge
    /// ```
    #[error("{entity} cannot move from {from} to {to}")]
    IllegalTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Zero, negative or overflowing monetary input.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The generator ran out of attempts and only has a fallback code.
    #[error("Tracking code generation exhausted after {attempts} attempts (fallback {fallback})")]
    GenerationExhausted { attempts: u32, fallback: String },

    /// The requested appointment slot is outside business hours or taken.
    #[error("Slot {date} {time} is not available")]
    SlotUnavailable { date: String, time: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an IllegalTransition error from two displayable states.
    pub fn illegal_transition(
        entity: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        CoreError::IllegalTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
