//! # garage-core: Pure Business Logic for Garage Tracker
//!
//! This crate holds the service tracking and lifecycle rules of the shop as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Garage Tracker Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Booking form / Tracking portal / Admin UI            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed requests (ts-rs bindings)        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 garage-store (Record Layer)                     │   │
//! │  │   CodeRegistry, AppointmentRepository, PaymentRepository, Shop  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ garage-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌───────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │ tracking │ │ lifecycle │ │  metrics  │ │ types/money  │     │   │
//! │  │   │ MC codes │ │ appt/pay  │ │  KPIs     │ │ validation   │     │   │
//! │  │   └──────────┘ └───────────┘ └───────────┘ └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO LOGGING • TIME COMES IN AS A VALUE   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tracking`] - Tracking code format, generator and code utilities
//! - [`lifecycle`] - Appointment and payment state machines, slot search
//! - [`metrics`] - Dashboard aggregates (ShopMetrics, PaymentStats, ...)
//! - [`types`] - Domain types (Appointment, Payment, TrackingRecord, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//! - [`validation`] - Structural input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use garage_core::tracking::{self, CodeGenerator};
//! use std::collections::HashSet;
//!
//! let issued = HashSet::new();
//! let code = CodeGenerator::default().generate(&issued).into_code();
//!
//! assert!(tracking::validate(code.as_str()));
//! assert_eq!(tracking::format_for_display(code.as_str()), code.display_form());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod money;
pub mod tracking;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tracking::{CodeGenerator, GeneratedCode, TrackingCode};
pub use types::*;
