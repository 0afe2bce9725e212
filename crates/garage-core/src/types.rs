//! # Domain Types
//!
//! Core domain types used throughout Garage Tracker.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ TrackingRecord  │   │   Appointment   │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  tracking_code ◄┼───┼─ tracking_code  │   │  id (UUID)      │       │
//! │  │  appointment_id─┼──►│  id (UUID)    ◄─┼───┼─ appointment_id │       │
//! │  │  status (copy)  │   │  status         │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐  ┌─────────────────┐       │
//! │  │  Testimonial    │   │AppointmentStatus │  │ PaymentStatus   │       │
//! │  │  rating 1..=5   │   │  Scheduled       │  │  Pending        │       │
//! │  │  (read-only)    │   │  InProgress      │  │  Partial        │       │
//! │  └─────────────────┘   │  Completed ■     │  │  Paid ■→Refunded│       │
//! │                        │  Cancelled ■     │  │  Failed         │       │
//! │                        └──────────────────┘  └─────────────────┘       │
//! │                                                   ■ = terminal         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cross References
//! Appointments and payments point at each other by id and tracking code.
//! These are lookups only: nothing here cascades a deletion.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::tracking::TrackingCode;

// =============================================================================
// Appointment Status
// =============================================================================

/// Progress of an appointment through the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked, vehicle not yet on the lift.
    #[default]
    Scheduled,
    /// Work started.
    InProgress,
    /// Work finished (terminal).
    Completed,
    /// Called off (terminal).
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Wire value (`in_progress`, ...).
    pub const fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(ValidationError::OutOfRange {
                    field: format!("appointment status '{}'", s),
                    min: 0,
                    max: AppointmentStatus::ALL.len() as i64 - 1,
                })
            })
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing received yet.
    #[default]
    Pending,
    /// Some money received, balance outstanding.
    Partial,
    /// Settled in full (terminal except for refund).
    Paid,
    /// Last attempt failed; may be retried.
    Failed,
    /// Money returned to the customer (terminal).
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Partial,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// `Refunded` only; `Paid` can still be refunded.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Refunded)
    }

    /// States that still expect money from the customer.
    pub const fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Partial)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(ValidationError::OutOfRange {
                    field: format!("payment status '{}'", s),
                    min: 0,
                    max: PaymentStatus::ALL.len() as i64 - 1,
                })
            })
    }
}

// =============================================================================
// Customer & Vehicle
// =============================================================================

/// Contact details captured on the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// The car being serviced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VehicleDetails {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub license_plate: String,
    pub mileage: u32,
}

impl fmt::Display for VehicleDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.make, self.model)
    }
}

// =============================================================================
// Tracking Record
// =============================================================================

/// Registry row behind a tracking code.
///
/// Only `status` and `updated_at` ever change after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrackingRecord {
    pub tracking_code: TrackingCode,
    pub appointment_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub service_name: String,
    pub status: AppointmentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TrackingRecord {
    /// Case-insensitive substring match over code, name, email and service.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.tracking_code.as_str().to_lowercase().contains(needle)
            || self.customer_name.to_lowercase().contains(needle)
            || self.customer_email.to_lowercase().contains(needle)
            || self.service_name.to_lowercase().contains(needle)
    }
}

// =============================================================================
// Appointment
// =============================================================================

/// A booked service visit.
///
/// ## Invariants
/// - `actual_completion.is_some()` ⇔ `status == Completed`
/// - `total_cost_cents >= 0`
/// - while not terminal, `total_cost = service_cost + additional_parts_cost`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Appointment {
    pub id: String,
    pub tracking_code: TrackingCode,
    pub customer: CustomerInfo,
    pub vehicle: VehicleDetails,
    pub service_id: String,
    #[ts(as = "String")]
    pub scheduled_date: NaiveDate,
    #[ts(as = "String")]
    pub scheduled_time: NaiveTime,
    pub status: AppointmentStatus,
    #[ts(as = "Option<String>")]
    pub estimated_completion: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub actual_completion: Option<DateTime<Utc>>,
    pub work_notes: Option<String>,
    /// Catalog price of the booked service, in cents.
    pub service_cost_cents: i64,
    pub additional_parts_cost_cents: i64,
    pub total_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    #[inline]
    pub fn additional_parts_cost(&self) -> Money {
        Money::from_cents(self.additional_parts_cost_cents)
    }

    /// True if this appointment holds its hourly slot.
    #[inline]
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Monetary settlement of a service visit.
///
/// ## Invariants
/// - `amount_due = total_amount − amount_paid`, `amount_due >= 0`
/// - `status == Paid` ⇒ `amount_due == 0` and `payment_date.is_some()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    /// Historical payments may predate appointment tracking.
    pub appointment_id: Option<String>,
    pub service_cost_cents: i64,
    pub parts_cost_cents: i64,
    /// Informational breakdown; already contained in the service cost.
    pub labor_cost_cents: i64,
    pub tax_amount_cents: i64,
    pub discount_amount_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub amount_due_cents: i64,
    pub status: PaymentStatus,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn amount_due(&self) -> Money {
        Money::from_cents(self.amount_due_cents)
    }

    /// Checks the monetary invariants listed on the type.
    pub fn is_consistent(&self) -> bool {
        let balanced = self.amount_due_cents == self.total_amount_cents - self.amount_paid_cents;
        let settled_ok = self.status != PaymentStatus::Paid
            || (self.amount_due_cents == 0 && self.payment_date.is_some());
        balanced && self.amount_due_cents >= 0 && settled_ok
    }
}

// =============================================================================
// Testimonial
// =============================================================================

/// Customer review. Read-only input to the metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Testimonial {
    pub id: String,
    /// 1..=5 stars.
    pub rating: u8,
    pub service_type: String,
    #[ts(as = "String")]
    pub date_created: DateTime<Utc>,
}

// =============================================================================
// Service Catalog
// =============================================================================

/// The slice of a catalog entry the metrics need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceCatalogEntry {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    /// Advertised duration in minutes.
    pub estimated_minutes: u32,
}

// =============================================================================
// Business Hours
// =============================================================================

/// Inclusive range of bookable hourly slots.
///
/// The default 09:00–18:00 yields ten slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        BusinessHours {
            open_hour: 9,
            close_hour: 18,
        }
    }
}

impl BusinessHours {
    /// Every bookable slot start, in order.
    pub fn slots(&self) -> impl Iterator<Item = NaiveTime> {
        (self.open_hour..=self.close_hour.min(23))
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
    }

    /// True if `time` is exactly one of the hourly slots.
    pub fn is_slot(&self, time: NaiveTime) -> bool {
        self.slots().any(|slot| slot == time)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Booking form payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAppointment {
    pub customer: CustomerInfo,
    pub vehicle: VehicleDetails,
    pub service_id: String,
    /// Copied into the tracking record so the portal can show it.
    pub service_name: String,
    pub service_cost_cents: i64,
    #[ts(as = "String")]
    pub scheduled_date: NaiveDate,
    #[ts(as = "String")]
    pub scheduled_time: NaiveTime,
    pub work_notes: Option<String>,
}

/// Invoice payload. All components are non-negative cents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    pub appointment_id: Option<String>,
    pub service_cost_cents: i64,
    pub parts_cost_cents: i64,
    pub labor_cost_cents: i64,
    pub tax_amount_cents: i64,
    pub discount_amount_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
