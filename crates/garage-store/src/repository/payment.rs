//! # Payment Repository
//!
//! Payment creation, receipts and admin status changes.
//!
//! ## Payment States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──receive(part)──► partial ──receive(rest)──► paid ──► refunded│
//! │      │  ▲                       │                        ▲              │
//! │      │  └──── retry ────┐       │                        │              │
//! │      ▼                  │       ▼                        │              │
//! │    failed ◄─────────────┴──── fail ──────── settle ──────┘              │
//! │                                                                         │
//! │   Invariant: amount_paid + amount_due == total_amount, always           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::FixedOffset;
use garage_core::lifecycle::{apply_payment_event, open_payment, PaymentEvent};
use garage_core::metrics::PaymentStats;
use garage_core::validation::validate_payment_amount;
use garage_core::{Clock, CoreError, NewPayment, Payment, PaymentStatus};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};

/// Repository for payments.
#[derive(Clone)]
pub struct PaymentRepository {
    store: Arc<dyn RecordStore<Payment>>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl PaymentRepository {
    pub fn new(
        store: Arc<dyn RecordStore<Payment>>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        PaymentRepository {
            store,
            clock,
            offset,
        }
    }

    /// Opens a pending payment with `amount_due = total_amount`.
    pub fn create(&self, request: &NewPayment) -> StoreResult<Payment> {
        let payment = open_payment(Uuid::new_v4().to_string(), request, self.clock.now())?;
        if !self.store.insert_new(payment.clone())? {
            return Err(StoreError::conflict("Payment", payment.id));
        }

        info!(
            payment_id = %payment.id,
            appointment_id = ?payment.appointment_id,
            total = %payment.total_amount(),
            "Payment created"
        );
        Ok(payment)
    }

    pub fn get(&self, id: &str) -> StoreResult<Payment> {
        self.store
            .get(id)?
            .ok_or_else(|| StoreError::not_found("Payment", id))
    }

    /// Records money received against a payment.
    ///
    /// ## Errors
    /// - `InvalidAmount` for `amount_cents <= 0` or more than is still due
    /// - `IllegalTransition` unless the payment is pending or partial
    /// - `NotFound` for an unknown id
    pub fn record_payment(&self, id: &str, amount_cents: i64) -> StoreResult<Payment> {
        validate_payment_amount(amount_cents)?;

        let now = self.clock.now();
        let updated = self
            .store
            .update(id, &mut |current| {
                apply_payment_event(current, PaymentEvent::Receive { amount_cents }, now)
            })?
            .ok_or_else(|| StoreError::not_found("Payment", id))?;

        info!(
            payment_id = %id,
            received_cents = amount_cents,
            status = %updated.status,
            due = %updated.amount_due(),
            "Payment received"
        );
        Ok(updated)
    }

    /// Admin status change.
    ///
    /// `paid` settles in full, `failed` fails, `pending` retries a failed
    /// payment and `refunded` refunds a paid one. `partial` cannot be set
    /// directly.
    pub fn update_status(&self, id: &str, status: PaymentStatus) -> StoreResult<Payment> {
        let now = self.clock.now();
        let updated = self
            .store
            .update(id, &mut |current| match PaymentEvent::towards(status) {
                Some(event) => apply_payment_event(current, event, now),
                None => Err(CoreError::illegal_transition(
                    "Payment",
                    current.status,
                    status,
                )),
            })?
            .ok_or_else(|| StoreError::not_found("Payment", id))?;

        info!(payment_id = %id, status = %updated.status, "Payment status updated");
        Ok(updated)
    }

    /// Every payment, newest first.
    pub fn all(&self) -> StoreResult<Vec<Payment>> {
        let mut payments = self.store.scan()?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(payments)
    }

    pub fn list_by_status(&self, status: PaymentStatus) -> StoreResult<Vec<Payment>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|p| p.status == status)
            .collect())
    }

    pub fn for_appointment(&self, appointment_id: &str) -> StoreResult<Vec<Payment>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|p| p.appointment_id.as_deref() == Some(appointment_id))
            .collect())
    }

    /// Financial summary over every payment.
    pub fn stats(&self) -> StoreResult<PaymentStats> {
        let payments = self.store.scan()?;
        debug!(payments = payments.len(), "Computing payment stats");
        Ok(PaymentStats::compute(&payments, self.clock.now(), self.offset))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use chrono::{Offset, TimeZone, Utc};
    use garage_core::FixedClock;

    fn repo() -> PaymentRepository {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        PaymentRepository::new(
            Arc::new(MemoryStore::<Payment>::new()),
            Arc::new(FixedClock::new(now)),
            Utc.fix(),
        )
    }

    fn invoice(service_cents: i64) -> NewPayment {
        NewPayment {
            appointment_id: Some("appt-1".to_string()),
            service_cost_cents: service_cents,
            ..NewPayment::default()
        }
    }

    #[test]
    fn test_partial_payments_converge() {
        let repo = repo();
        let payment = repo.create(&invoice(28753)).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount_due_cents, 28753);

        let partial = repo.record_payment(&payment.id, 15000).unwrap();
        assert_eq!(partial.status, PaymentStatus::Partial);
        assert_eq!(partial.amount_paid_cents, 15000);
        assert_eq!(partial.amount_due_cents, 13753);
        assert!(partial.payment_date.is_none());

        let paid = repo.record_payment(&payment.id, 13753).unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.amount_due_cents, 0);
        assert!(paid.payment_date.is_some());
        assert!(paid.is_consistent());
    }

    #[test]
    fn test_rejected_receipts_leave_payment_unchanged() {
        let repo = repo();
        let payment = repo.create(&invoice(5000)).unwrap();

        for bad in [0, -100, 5001] {
            let err = repo.record_payment(&payment.id, bad).unwrap_err();
            assert!(matches!(err, StoreError::Core(CoreError::InvalidAmount { .. })));
        }
        assert_eq!(repo.get(&payment.id).unwrap(), payment);
        assert!(repo.record_payment("missing", 100).unwrap_err().is_not_found());
    }

    #[test]
    fn test_status_changes() {
        let repo = repo();
        let payment = repo.create(&invoice(8000)).unwrap();

        let err = repo
            .update_status(&payment.id, PaymentStatus::Partial)
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::IllegalTransition { .. })));

        let failed = repo.update_status(&payment.id, PaymentStatus::Failed).unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert!(repo.record_payment(&payment.id, 100).is_err());

        let retried = repo.update_status(&payment.id, PaymentStatus::Pending).unwrap();
        assert_eq!(retried.status, PaymentStatus::Pending);

        let paid = repo.update_status(&payment.id, PaymentStatus::Paid).unwrap();
        assert_eq!(paid.amount_paid_cents, 8000);
        assert_eq!(paid.amount_due_cents, 0);

        let refunded = repo.update_status(&payment.id, PaymentStatus::Refunded).unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert!(repo.update_status(&payment.id, PaymentStatus::Paid).is_err());
        assert!(repo
            .update_status("missing", PaymentStatus::Paid)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_listing_and_stats() {
        let repo = repo();
        let a = repo.create(&invoice(10000)).unwrap();
        let b = repo.create(&invoice(5003)).unwrap();
        repo.create(&NewPayment {
            service_cost_cents: 2000,
            ..NewPayment::default()
        })
        .unwrap();

        repo.update_status(&a.id, PaymentStatus::Paid).unwrap();
        repo.record_payment(&b.id, 5003).unwrap();

        assert_eq!(repo.list_by_status(PaymentStatus::Paid).unwrap().len(), 2);
        assert_eq!(repo.list_by_status(PaymentStatus::Pending).unwrap().len(), 1);
        assert_eq!(repo.for_appointment("appt-1").unwrap().len(), 2);
        assert!(repo.for_appointment("appt-2").unwrap().is_empty());

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total_revenue_cents, 15003);
        assert_eq!(stats.pending_amount_cents, 2000);
        assert_eq!(stats.paid_count, 2);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.average_transaction_value_cents, 7502);
    }
}
