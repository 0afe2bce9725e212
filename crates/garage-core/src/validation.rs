//! # Validation Module
//!
//! Structural checks the core runs before it touches any record.
//!
//! The booking and invoice forms already validate what the customer typed;
//! these functions only guard the invariants the lifecycles depend on.
//!
//! ## Usage
//! ```rust
//! use garage_core::validation::{validate_payment_amount, validate_rating};
//!
//! assert!(validate_payment_amount(15000).is_ok());
//! assert!(validate_payment_amount(0).is_err());
//! assert!(validate_rating(5).is_ok());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Money Validators
// =============================================================================

/// Validates an incoming payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(cents: i64) -> CoreResult<()> {
    if cents <= 0 {
        return Err(CoreError::invalid_amount(format!(
            "payment amount must be positive, got {} cents",
            cents
        )));
    }
    Ok(())
}

/// Validates a cost component (parts, tax, discount, ...).
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed
pub fn validate_non_negative(field: &str, cents: i64) -> CoreResult<()> {
    if cents < 0 {
        return Err(CoreError::invalid_amount(format!(
            "{} must not be negative, got {} cents",
            field, cents
        )));
    }
    Ok(())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a testimonial rating (1..=5 stars).
pub fn validate_rating(rating: u8) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

/// Validates a required text field.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
