//! # Lifecycle Module
//!
//! State machines for appointments and payments.
//!
//! Every function here takes the current record by reference and returns a
//! new one. A rejected move returns an error and the caller still holds the
//! untouched record, so a store can swap records atomically and an
//! optimistic UI can revert without cleanup.
//!
//! ## Appointment
//! ```text
//!   ┌───────────┐  Start   ┌─────────────┐ Complete ┌───────────┐
//!   │ scheduled │─────────►│ in_progress │─────────►│ completed │ ■
//!   └─────┬─────┘          └──────┬──────┘          └───────────┘
//!         │ Cancel                │ Cancel
//!         ▼                       ▼
//!   ┌─────────────────────────────────────┐
//!   │              cancelled              │ ■
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Payment
//! ```text
//!   ┌─────────┐ Receive ┌─────────┐ Receive (due = 0) ┌──────┐ Refund ┌──────────┐
//!   │ pending │────────►│ partial │─────────────────►│ paid │───────►│ refunded │ ■
//!   └────┬────┘         └────┬────┘                  └──────┘        └──────────┘
//!        │ ▲ Retry           │ Fail                     ▲
//!   Fail ▼ │                 ▼                          │ Settle (pending/partial/failed)
//!   ┌──────┴──────────────────────┐                     │
//!   │           failed            │─────────────────────┘
//!   └─────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tracking::TrackingCode;
use crate::types::{
    Appointment, AppointmentStatus, BusinessHours, NewAppointment, NewPayment, Payment,
    PaymentStatus,
};
use crate::validation::{validate_non_negative, validate_payment_amount};

// =============================================================================
// Appointment Transitions
// =============================================================================

/// Something that happens to an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEvent {
    /// Mechanic picks the vehicle up.
    Start,
    /// Work is done.
    Complete,
    /// Customer or shop calls it off.
    Cancel,
}

impl AppointmentEvent {
    /// Status this event leads to when it is legal.
    pub const fn target(&self) -> AppointmentStatus {
        match self {
            AppointmentEvent::Start => AppointmentStatus::InProgress,
            AppointmentEvent::Complete => AppointmentStatus::Completed,
            AppointmentEvent::Cancel => AppointmentStatus::Cancelled,
        }
    }

    /// The event that would move an appointment into `status`.
    ///
    /// `Scheduled` has no incoming event.
    pub const fn towards(status: AppointmentStatus) -> Option<Self> {
        match status {
            AppointmentStatus::Scheduled => None,
            AppointmentStatus::InProgress => Some(AppointmentEvent::Start),
            AppointmentStatus::Completed => Some(AppointmentEvent::Complete),
            AppointmentStatus::Cancelled => Some(AppointmentEvent::Cancel),
        }
    }
}

/// `(state, event) -> next | IllegalTransition`.
pub fn next_appointment_status(
    state: AppointmentStatus,
    event: AppointmentEvent,
) -> CoreResult<AppointmentStatus> {
    use AppointmentEvent::*;
    use AppointmentStatus::*;

    match (state, event) {
        (Scheduled, Start) => Ok(InProgress),
        (InProgress, Complete) => Ok(Completed),
        (Scheduled, Cancel) | (InProgress, Cancel) => Ok(Cancelled),
        (Scheduled, Complete) | (InProgress, Start) | (Completed, _) | (Cancelled, _) => Err(
            CoreError::illegal_transition("Appointment", state, event.target()),
        ),
    }
}

/// Resolves a requested target status.
///
/// Asking for the current status of a live appointment is a field-only
/// update. Terminal appointments accept nothing.
fn resolve_appointment_target(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> CoreResult<AppointmentStatus> {
    if from == to && !from.is_terminal() {
        return Ok(to);
    }
    let event = AppointmentEvent::towards(to)
        .ok_or_else(|| CoreError::illegal_transition("Appointment", from, to))?;
    next_appointment_status(from, event)
}

/// Admin status change with optional field merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppointmentUpdate {
    pub status: AppointmentStatus,
    pub work_notes: Option<String>,
    pub additional_parts_cost_cents: Option<i64>,
}

impl AppointmentUpdate {
    pub fn to(status: AppointmentStatus) -> Self {
        AppointmentUpdate {
            status,
            work_notes: None,
            additional_parts_cost_cents: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.work_notes = Some(notes.into());
        self
    }

    pub fn with_parts_cost(mut self, cents: i64) -> Self {
        self.additional_parts_cost_cents = Some(cents);
        self
    }
}

/// Builds a freshly booked appointment.
pub fn open_appointment(
    id: String,
    tracking_code: TrackingCode,
    request: NewAppointment,
    now: DateTime<Utc>,
) -> CoreResult<Appointment> {
    validate_non_negative("service cost", request.service_cost_cents)?;

    Ok(Appointment {
        id,
        tracking_code,
        customer: request.customer,
        vehicle: request.vehicle,
        service_id: request.service_id,
        scheduled_date: request.scheduled_date,
        scheduled_time: request.scheduled_time,
        status: AppointmentStatus::Scheduled,
        estimated_completion: None,
        actual_completion: None,
        work_notes: request.work_notes,
        service_cost_cents: request.service_cost_cents,
        additional_parts_cost_cents: 0,
        total_cost_cents: request.service_cost_cents,
        created_at: now,
        updated_at: now,
    })
}

/// Applies an admin update and returns the new appointment.
///
/// ## Order of Checks
/// 1. `additional_parts_cost < 0` → `InvalidAmount`
/// 2. transition table → `IllegalTransition`
/// 3. merge notes and parts cost, recompute the total, stamp `updated_at`
///
/// The total is recomputed before completion so the parts cost entered with
/// the `Complete` request is what gets frozen.
pub fn apply_appointment_update(
    current: &Appointment,
    update: &AppointmentUpdate,
    now: DateTime<Utc>,
) -> CoreResult<Appointment> {
    if let Some(parts) = update.additional_parts_cost_cents {
        validate_non_negative("additional parts cost", parts)?;
    }
    let next_status = resolve_appointment_target(current.status, update.status)?;

    let mut next = current.clone();
    if let Some(notes) = &update.work_notes {
        next.work_notes = Some(notes.clone());
    }
    if let Some(parts) = update.additional_parts_cost_cents {
        next.additional_parts_cost_cents = parts;
    }
    next.total_cost_cents = Money::from_cents(next.service_cost_cents)
        .checked_add(Money::from_cents(next.additional_parts_cost_cents))
        .ok_or_else(|| CoreError::invalid_amount("total cost overflow"))?
        .cents();

    next.status = next_status;
    if next_status == AppointmentStatus::Completed && current.status != next_status {
        next.actual_completion = Some(now);
    }
    next.updated_at = now;
    Ok(next)
}

/// Sets the promised pickup time on a live appointment.
pub fn set_estimated_completion(
    current: &Appointment,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<Appointment> {
    if current.status.is_terminal() {
        return Err(CoreError::illegal_transition(
            "Appointment",
            current.status,
            current.status,
        ));
    }
    let mut next = current.clone();
    next.estimated_completion = Some(at);
    next.updated_at = now;
    Ok(next)
}

// =============================================================================
// Slots
// =============================================================================

/// Hourly slots on `date` not held by a non-cancelled appointment.
///
/// Returned in order as `HH:MM:SS`.
pub fn available_slots(
    hours: &BusinessHours,
    date: NaiveDate,
    appointments: &[Appointment],
) -> Vec<String> {
    hours
        .slots()
        .filter(|slot| {
            !appointments.iter().any(|appt| {
                appt.occupies_slot() && appt.scheduled_date == date && appt.scheduled_time == *slot
            })
        })
        .map(|slot| slot.format("%H:%M:%S").to_string())
        .collect()
}

// =============================================================================
// Payment Transitions
// =============================================================================

/// Something that happens to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PaymentEvent {
    /// Money received from the customer.
    Receive { amount_cents: i64 },
    /// Marked paid in full directly by an admin.
    Settle,
    /// Card declined, cheque bounced, ...
    Fail,
    /// A failed payment is reopened.
    Retry,
    /// Money returned after settlement.
    Refund,
}

impl PaymentEvent {
    /// The event an admin status change maps to.
    ///
    /// `Partial` has none: it is only reached by receiving money.
    pub const fn towards(status: PaymentStatus) -> Option<Self> {
        match status {
            PaymentStatus::Pending => Some(PaymentEvent::Retry),
            PaymentStatus::Partial => None,
            PaymentStatus::Paid => Some(PaymentEvent::Settle),
            PaymentStatus::Failed => Some(PaymentEvent::Fail),
            PaymentStatus::Refunded => Some(PaymentEvent::Refund),
        }
    }
}

/// Builds a pending payment from an invoice.
///
/// `total = service + parts + tax − discount`. Labor is already part of the
/// service cost and only recorded for the breakdown.
pub fn open_payment(id: String, request: &NewPayment, now: DateTime<Utc>) -> CoreResult<Payment> {
    validate_non_negative("service cost", request.service_cost_cents)?;
    validate_non_negative("parts cost", request.parts_cost_cents)?;
    validate_non_negative("labor cost", request.labor_cost_cents)?;
    validate_non_negative("tax amount", request.tax_amount_cents)?;
    validate_non_negative("discount amount", request.discount_amount_cents)?;

    let total = Money::from_cents(request.service_cost_cents)
        .checked_add(Money::from_cents(request.parts_cost_cents))
        .and_then(|sum| sum.checked_add(Money::from_cents(request.tax_amount_cents)))
        .and_then(|sum| sum.checked_sub(Money::from_cents(request.discount_amount_cents)))
        .ok_or_else(|| CoreError::invalid_amount("payment total overflow"))?;
    if total.is_negative() {
        return Err(CoreError::invalid_amount(format!(
            "discount exceeds charges, total would be {}",
            total
        )));
    }

    Ok(Payment {
        id,
        appointment_id: request.appointment_id.clone(),
        service_cost_cents: request.service_cost_cents,
        parts_cost_cents: request.parts_cost_cents,
        labor_cost_cents: request.labor_cost_cents,
        tax_amount_cents: request.tax_amount_cents,
        discount_amount_cents: request.discount_amount_cents,
        total_amount_cents: total.cents(),
        amount_paid_cents: 0,
        amount_due_cents: total.cents(),
        status: PaymentStatus::Pending,
        payment_date: None,
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// `(payment, event) -> next payment | error`.
///
/// ## Errors
/// - `InvalidAmount`: non-positive receipt, or more than is still due
/// - `IllegalTransition`: the event is not allowed from the current status
pub fn apply_payment_event(
    current: &Payment,
    event: PaymentEvent,
    now: DateTime<Utc>,
) -> CoreResult<Payment> {
    use PaymentEvent::*;
    use PaymentStatus::*;

    if let Receive { amount_cents } = event {
        validate_payment_amount(amount_cents)?;
    }

    let mut next = current.clone();
    match (current.status, event) {
        (Pending | Partial, Receive { amount_cents }) => {
            if amount_cents > current.amount_due_cents {
                return Err(CoreError::invalid_amount(format!(
                    "{} exceeds the {} still due",
                    Money::from_cents(amount_cents),
                    current.amount_due()
                )));
            }
            next.amount_paid_cents = current.amount_paid_cents + amount_cents;
            next.amount_due_cents = current.total_amount_cents - next.amount_paid_cents;
            if next.amount_due_cents == 0 {
                next.status = Paid;
                next.payment_date = Some(now);
            } else {
                next.status = Partial;
            }
        }
        (Pending | Partial | Failed, Settle) => {
            next.amount_paid_cents = current.total_amount_cents;
            next.amount_due_cents = 0;
            next.status = Paid;
            next.payment_date = Some(now);
        }
        (Pending | Partial | Failed, Fail) => next.status = Failed,
        (Failed, Retry) => next.status = Pending,
        (Paid, Refund) => next.status = Refunded,
        (Failed | Paid | Refunded, Receive { .. })
        | (Paid | Refunded, Settle | Fail)
        | (Pending | Partial | Paid | Refunded, Retry)
        | (Pending | Partial | Failed | Refunded, Refund) => {
            return Err(CoreError::illegal_transition(
                "Payment",
                current.status,
                payment_event_label(event),
            ));
        }
    }

    next.updated_at = now;
    Ok(next)
}

fn payment_event_label(event: PaymentEvent) -> PaymentStatus {
    match event {
        PaymentEvent::Receive { .. } => PaymentStatus::Partial,
        PaymentEvent::Settle => PaymentStatus::Paid,
        PaymentEvent::Fail => PaymentStatus::Failed,
        PaymentEvent::Retry => PaymentStatus::Pending,
        PaymentEvent::Refund => PaymentStatus::Refunded,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerInfo, VehicleDetails};
    use chrono::{NaiveTime, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn later(hours: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::hours(hours)
    }

    fn booking(hour: u32) -> NewAppointment {
        NewAppointment {
            customer: CustomerInfo {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: None,
            },
            vehicle: VehicleDetails {
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: 2019,
                license_plate: "ABC-123".to_string(),
                mileage: 42_000,
            },
            service_id: "oil-change".to_string(),
            service_name: "Oil Change".to_string(),
            service_cost_cents: 4999,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            work_notes: None,
        }
    }

    fn appointment(hour: u32) -> Appointment {
        let code = TrackingCode::parse("MC-2024-001235").unwrap();
        open_appointment(format!("appt-{}", hour), code, booking(hour), t0()).unwrap()
    }

    fn invoice(total_cents: i64) -> Payment {
        let request = NewPayment {
            service_cost_cents: total_cents,
            ..NewPayment::default()
        };
        open_payment("pay-1".to_string(), &request, t0()).unwrap()
    }

    // -------------------------------------------------------------------------
    // Appointment
    // -------------------------------------------------------------------------

    #[test]
    fn test_transition_table() {
        use AppointmentEvent::*;
        use AppointmentStatus::*;

        assert_eq!(next_appointment_status(Scheduled, Start).unwrap(), InProgress);
        assert_eq!(next_appointment_status(Scheduled, Cancel).unwrap(), Cancelled);
        assert_eq!(next_appointment_status(InProgress, Complete).unwrap(), Completed);
        assert_eq!(next_appointment_status(InProgress, Cancel).unwrap(), Cancelled);
        assert!(next_appointment_status(Scheduled, Complete).is_err());
        assert!(next_appointment_status(InProgress, Start).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let started = apply_appointment_update(
            &appointment(10),
            &AppointmentUpdate::to(AppointmentStatus::InProgress),
            later(1),
        )
        .unwrap();
        let completed = apply_appointment_update(
            &started,
            &AppointmentUpdate::to(AppointmentStatus::Completed),
            later(3),
        )
        .unwrap();
        let cancelled = apply_appointment_update(
            &appointment(11),
            &AppointmentUpdate::to(AppointmentStatus::Cancelled),
            later(1),
        )
        .unwrap();

        for terminal in [&completed, &cancelled] {
            for target in AppointmentStatus::ALL {
                let err =
                    apply_appointment_update(terminal, &AppointmentUpdate::to(target), later(5))
                        .unwrap_err();
                assert!(matches!(err, CoreError::IllegalTransition { .. }));
            }
        }
    }

    #[test]
    fn test_completed_to_in_progress_leaves_record_unchanged() {
        let started = apply_appointment_update(
            &appointment(10),
            &AppointmentUpdate::to(AppointmentStatus::InProgress),
            later(1),
        )
        .unwrap();
        let completed = apply_appointment_update(
            &started,
            &AppointmentUpdate::to(AppointmentStatus::Completed),
            later(3),
        )
        .unwrap();
        let snapshot = completed.clone();

        let err = apply_appointment_update(
            &completed,
            &AppointmentUpdate::to(AppointmentStatus::InProgress).with_notes("reopen"),
            later(4),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Appointment cannot move from completed to in_progress"
        );
        assert_eq!(completed, snapshot);
    }

    #[test]
    fn test_completion_stamps_and_freezes_total() {
        let appt = appointment(10);
        assert_eq!(appt.total_cost_cents, 4999);
        assert!(appt.actual_completion.is_none());

        let started = apply_appointment_update(
            &appt,
            &AppointmentUpdate::to(AppointmentStatus::InProgress).with_parts_cost(2500),
            later(1),
        )
        .unwrap();
        assert_eq!(started.total_cost_cents, 7499);
        assert!(started.actual_completion.is_none());

        let completed = apply_appointment_update(
            &started,
            &AppointmentUpdate::to(AppointmentStatus::Completed)
                .with_parts_cost(3000)
                .with_notes("replaced filter"),
            later(3),
        )
        .unwrap();
        assert_eq!(completed.total_cost_cents, 7999);
        assert_eq!(completed.actual_completion, Some(later(3)));
        assert_eq!(completed.work_notes.as_deref(), Some("replaced filter"));
        assert_eq!(completed.updated_at, later(3));

        let refused = apply_appointment_update(
            &completed,
            &AppointmentUpdate::to(AppointmentStatus::Completed).with_parts_cost(9999),
            later(4),
        );
        assert!(refused.is_err());
    }

    #[test]
    fn test_field_only_update_on_live_appointment() {
        let appt = appointment(10);
        let noted = apply_appointment_update(
            &appt,
            &AppointmentUpdate::to(AppointmentStatus::Scheduled).with_notes("customer called"),
            later(1),
        )
        .unwrap();
        assert_eq!(noted.status, AppointmentStatus::Scheduled);
        assert_eq!(noted.work_notes.as_deref(), Some("customer called"));
    }

    #[test]
    fn test_negative_parts_cost_rejected_first() {
        let completed_like = appointment(10);
        let err = apply_appointment_update(
            &completed_like,
            &AppointmentUpdate::to(AppointmentStatus::Completed).with_parts_cost(-1),
            later(1),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_estimated_completion_only_while_live() {
        let appt = appointment(10);
        let estimated = set_estimated_completion(&appt, later(6), later(1)).unwrap();
        assert_eq!(estimated.estimated_completion, Some(later(6)));

        let cancelled = apply_appointment_update(
            &appt,
            &AppointmentUpdate::to(AppointmentStatus::Cancelled),
            later(1),
        )
        .unwrap();
        assert!(set_estimated_completion(&cancelled, later(6), later(2)).is_err());
    }

    #[test]
    fn test_available_slots_complement() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let booked = vec![appointment(13)];

        let slots = available_slots(&BusinessHours::default(), date, &booked);
        assert_eq!(slots.len(), 9);
        assert!(!slots.contains(&"13:00:00".to_string()));
        assert_eq!(slots.first().map(String::as_str), Some("09:00:00"));
        assert_eq!(slots.last().map(String::as_str), Some("18:00:00"));
    }

    #[test]
    fn test_cancelled_appointment_frees_slot() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let cancelled = apply_appointment_update(
            &appointment(13),
            &AppointmentUpdate::to(AppointmentStatus::Cancelled),
            later(1),
        )
        .unwrap();

        let slots = available_slots(&BusinessHours::default(), date, &[cancelled]);
        assert_eq!(slots.len(), 10);

        let other_day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        assert_eq!(
            available_slots(&BusinessHours::default(), other_day, &[appointment(13)]).len(),
            10
        );
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    #[test]
    fn test_open_payment_totals() {
        let request = NewPayment {
            appointment_id: Some("appt-1".to_string()),
            service_cost_cents: 20000,
            parts_cost_cents: 5000,
            labor_cost_cents: 8000,
            tax_amount_cents: 2000,
            discount_amount_cents: 1500,
            notes: None,
        };
        let payment = open_payment("pay-1".to_string(), &request, t0()).unwrap();
        assert_eq!(payment.total_amount_cents, 25500);
        assert_eq!(payment.amount_due_cents, 25500);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.is_consistent());
    }

    #[test]
    fn test_open_payment_rejects_negative() {
        let negative_tax = NewPayment {
            service_cost_cents: 1000,
            tax_amount_cents: -1,
            ..NewPayment::default()
        };
        assert!(open_payment("p".to_string(), &negative_tax, t0()).is_err());

        let huge_discount = NewPayment {
            service_cost_cents: 1000,
            discount_amount_cents: 1001,
            ..NewPayment::default()
        };
        let err = open_payment("p".to_string(), &huge_discount, t0()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_partial_payments_converge_to_paid() {
        let payment = invoice(28753);

        let first = apply_payment_event(
            &payment,
            PaymentEvent::Receive { amount_cents: 15000 },
            later(1),
        )
        .unwrap();
        assert_eq!(first.status, PaymentStatus::Partial);
        assert_eq!(first.amount_due_cents, 13753);
        assert!(first.payment_date.is_none());

        let second = apply_payment_event(
            &first,
            PaymentEvent::Receive { amount_cents: 13753 },
            later(2),
        )
        .unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);
        assert_eq!(second.amount_due_cents, 0);
        assert_eq!(second.amount_paid_cents, 28753);
        assert_eq!(second.payment_date, Some(later(2)));
    }

    #[test]
    fn test_receive_rejects_bad_amounts() {
        let payment = invoice(10000);
        for amount in [0, -500, 10001] {
            let err = apply_payment_event(
                &payment,
                PaymentEvent::Receive {
                    amount_cents: amount,
                },
                later(1),
            )
            .unwrap_err();
            assert!(matches!(err, CoreError::InvalidAmount { .. }));
        }
    }

    #[test]
    fn test_settle_marks_fully_paid() {
        let partial = apply_payment_event(
            &invoice(10000),
            PaymentEvent::Receive { amount_cents: 2500 },
            later(1),
        )
        .unwrap();
        let paid = apply_payment_event(&partial, PaymentEvent::Settle, later(2)).unwrap();
        assert_eq!(paid.amount_paid_cents, 10000);
        assert_eq!(paid.amount_due_cents, 0);
        assert_eq!(paid.payment_date, Some(later(2)));
    }

    #[test]
    fn test_failed_retry_and_refund_paths() {
        let failed = apply_payment_event(&invoice(10000), PaymentEvent::Fail, later(1)).unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert!(matches!(
            apply_payment_event(&failed, PaymentEvent::Receive { amount_cents: 100 }, later(2)),
            Err(CoreError::IllegalTransition { .. })
        ));

        let retried = apply_payment_event(&failed, PaymentEvent::Retry, later(2)).unwrap();
        assert_eq!(retried.status, PaymentStatus::Pending);

        let paid = apply_payment_event(&retried, PaymentEvent::Settle, later(3)).unwrap();
        assert!(apply_payment_event(&paid, PaymentEvent::Fail, later(4)).is_err());

        let refunded = apply_payment_event(&paid, PaymentEvent::Refund, later(4)).unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        for event in [
            PaymentEvent::Receive { amount_cents: 1 },
            PaymentEvent::Settle,
            PaymentEvent::Fail,
            PaymentEvent::Retry,
            PaymentEvent::Refund,
        ] {
            assert!(apply_payment_event(&refunded, event, later(5)).is_err());
        }
    }

    #[test]
    fn test_partial_has_no_direct_event() {
        assert_eq!(PaymentEvent::towards(PaymentStatus::Partial), None);
        assert_eq!(
            PaymentEvent::towards(PaymentStatus::Paid),
            Some(PaymentEvent::Settle)
        );
    }

    fn any_event() -> impl Strategy<Value = PaymentEvent> {
        prop_oneof![
            (1i64..40_000).prop_map(|amount_cents| PaymentEvent::Receive { amount_cents }),
            Just(PaymentEvent::Settle),
            Just(PaymentEvent::Fail),
            Just(PaymentEvent::Retry),
            Just(PaymentEvent::Refund),
        ]
    }

    proptest! {
        #[test]
        fn prop_payment_invariant_holds_in_every_reachable_state(
            total in 0i64..100_000,
            events in proptest::collection::vec(any_event(), 0..30),
        ) {
            let mut payment = invoice(total);
            prop_assert!(payment.is_consistent());

            for (step, event) in events.into_iter().enumerate() {
                let before = payment.clone();
                match apply_payment_event(&payment, event, later(step as i64 + 1)) {
                    Ok(next) => payment = next,
                    Err(_) => prop_assert_eq!(&payment, &before),
                }
                prop_assert!(payment.is_consistent());
                prop_assert!(payment.amount_due_cents >= 0);
                prop_assert_eq!(payment.total_amount_cents, total);
            }
        }
    }
}
