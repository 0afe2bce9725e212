//! # Appointment Repository
//!
//! Booking and the appointment lifecycle.
//!
//! ## Booking Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  book(NewAppointment)                                                   │
//! │       │                                                                 │
//! │       ├── slot outside business hours or taken? → SlotUnavailable       │
//! │       ├── negative service cost?                 → InvalidAmount        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CodeRegistry::issue  ──► MC-YYYY-NNNNNN (record: scheduled)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert Appointment { status: scheduled, total = service cost }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status changes go through [`apply_appointment_update`] inside one store
//! update, then the new status is mirrored into the registry record.

use chrono::{DateTime, NaiveDate, Utc};
use garage_core::lifecycle::{
    self, apply_appointment_update, open_appointment, AppointmentUpdate,
};
use garage_core::validation::validate_non_negative;
use garage_core::{
    Appointment, AppointmentStatus, BusinessHours, Clock, CoreError, NewAppointment, TrackingCode,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::tracking::CodeRegistry;
use super::RecordStore;
use crate::error::{StoreError, StoreResult};

/// Repository for appointments.
#[derive(Clone)]
pub struct AppointmentRepository {
    store: Arc<dyn RecordStore<Appointment>>,
    registry: CodeRegistry,
    clock: Arc<dyn Clock>,
    hours: BusinessHours,
}

impl AppointmentRepository {
    pub fn new(
        store: Arc<dyn RecordStore<Appointment>>,
        registry: CodeRegistry,
        clock: Arc<dyn Clock>,
        hours: BusinessHours,
    ) -> Self {
        AppointmentRepository {
            store,
            registry,
            clock,
            hours,
        }
    }

    /// Books a new appointment and issues its tracking code.
    pub fn book(&self, request: NewAppointment) -> StoreResult<Appointment> {
        let slot_free = self.hours.is_slot(request.scheduled_time)
            && !self.store.scan()?.iter().any(|appt| {
                appt.occupies_slot()
                    && appt.scheduled_date == request.scheduled_date
                    && appt.scheduled_time == request.scheduled_time
            });
        if !slot_free {
            return Err(CoreError::SlotUnavailable {
                date: request.scheduled_date.to_string(),
                time: request.scheduled_time.format("%H:%M:%S").to_string(),
            }
            .into());
        }
        validate_non_negative("service cost", request.service_cost_cents)?;

        let id = Uuid::new_v4().to_string();
        let code = self
            .registry
            .issue(&request.customer, &request.service_name, &id)?
            .into_code();

        let appointment = open_appointment(id, code, request, self.clock.now())?;
        if !self.store.insert_new(appointment.clone())? {
            return Err(StoreError::conflict("Appointment", appointment.id));
        }

        info!(
            appointment_id = %appointment.id,
            code = %appointment.tracking_code,
            date = %appointment.scheduled_date,
            time = %appointment.scheduled_time,
            "Appointment booked"
        );
        Ok(appointment)
    }

    pub fn get(&self, id: &str) -> StoreResult<Appointment> {
        self.store
            .get(id)?
            .ok_or_else(|| StoreError::not_found("Appointment", id))
    }

    /// Applies an admin status change.
    ///
    /// ## Errors
    /// - `InvalidAmount` for a negative parts cost
    /// - `IllegalTransition` if the move is not allowed (record unchanged)
    /// - `NotFound` for an unknown id
    pub fn update_status(&self, id: &str, update: AppointmentUpdate) -> StoreResult<Appointment> {
        let now = self.clock.now();
        let updated = self
            .store
            .update(id, &mut |current| apply_appointment_update(current, &update, now))?
            .ok_or_else(|| StoreError::not_found("Appointment", id))?;

        self.mirror_status(&updated);
        info!(
            appointment_id = %id,
            status = %updated.status,
            total_cost = %updated.total_cost(),
            "Appointment status updated"
        );
        Ok(updated)
    }

    /// The appointment is already committed here, so a registry failure is
    /// logged rather than returned.
    fn mirror_status(&self, appointment: &Appointment) {
        let code = appointment.tracking_code.as_str();
        match self.registry.update_status(code, appointment.status) {
            Ok(true) => {}
            Ok(false) => warn!(
                appointment_id = %appointment.id,
                code = %code,
                "Appointment has no tracking record to mirror status into"
            ),
            Err(e) => warn!(
                appointment_id = %appointment.id,
                code = %code,
                error = %e,
                "Failed to mirror appointment status into tracking record"
            ),
        }
    }

    /// Sets the promised pickup time on a live appointment.
    pub fn set_estimated_completion(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let now = self.clock.now();
        let updated = self
            .store
            .update(id, &mut |current| {
                lifecycle::set_estimated_completion(current, at, now)
            })?
            .ok_or_else(|| StoreError::not_found("Appointment", id))?;
        debug!(appointment_id = %id, estimated = %at, "Estimated completion set");
        Ok(updated)
    }

    /// The appointment behind a tracking code.
    pub fn find_by_tracking_code(&self, code: &str) -> StoreResult<Appointment> {
        let code = TrackingCode::parse(code)?;
        self.store
            .scan()?
            .into_iter()
            .find(|appt| appt.tracking_code == code)
            .ok_or_else(|| StoreError::not_found("Appointment", code.as_str()))
    }

    /// Every appointment, ordered by slot.
    pub fn all(&self) -> StoreResult<Vec<Appointment>> {
        let mut appointments = self.store.scan()?;
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }

    pub fn list_by_status(&self, status: AppointmentStatus) -> StoreResult<Vec<Appointment>> {
        self.filtered(|appt| appt.status == status)
    }

    /// Appointments scheduled within `[from, to]`, ordered by slot.
    pub fn list_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        self.filtered(|appt| (from..=to).contains(&appt.scheduled_date))
    }

    /// Free hourly slots on `date` as `HH:MM:SS`.
    pub fn available_slots(&self, date: NaiveDate) -> StoreResult<Vec<String>> {
        let appointments = self.store.scan()?;
        Ok(lifecycle::available_slots(&self.hours, date, &appointments))
    }

    /// Live bookings on `date`.
    pub fn todays(&self, date: NaiveDate) -> StoreResult<Vec<Appointment>> {
        self.filtered(|appt| appt.occupies_slot() && appt.scheduled_date == date)
    }

    /// Still-scheduled appointments on or after `date`.
    pub fn upcoming(&self, date: NaiveDate) -> StoreResult<Vec<Appointment>> {
        self.filtered(|appt| {
            appt.status == AppointmentStatus::Scheduled && appt.scheduled_date >= date
        })
    }

    fn filtered(&self, keep: impl Fn(&Appointment) -> bool) -> StoreResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> =
            self.store.scan()?.into_iter().filter(|a| keep(a)).collect();
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }
}

fn sort_by_slot(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        (a.scheduled_date, a.scheduled_time, &a.id).cmp(&(b.scheduled_date, b.scheduled_time, &b.id))
    });
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use chrono::{NaiveTime, TimeZone};
    use garage_core::tracking::CodeGenerator;
    use garage_core::{CoreResult, CustomerInfo, FixedClock, TrackingRecord, VehicleDetails};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn repo() -> (AppointmentRepository, CodeRegistry) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        let tracking: Arc<dyn RecordStore<TrackingRecord>> =
            Arc::new(MemoryStore::<TrackingRecord>::new());
        let registry = CodeRegistry::new(tracking, Arc::clone(&clock), CodeGenerator::default(), 10);
        let repo = AppointmentRepository::new(
            Arc::new(MemoryStore::<Appointment>::new()),
            registry.clone(),
            clock,
            BusinessHours::default(),
        );
        (repo, registry)
    }

    fn request(day: u32, hour: u32) -> NewAppointment {
        NewAppointment {
            customer: CustomerInfo {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: Some("555-0100".to_string()),
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
            scheduled_date: date(day),
            scheduled_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            work_notes: None,
        }
    }

    #[test]
    fn test_book_issues_code_and_record() {
        let (repo, registry) = repo();
        let appt = repo.book(request(15, 10)).unwrap();

        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.total_cost_cents, 4999);
        assert!(appt.actual_completion.is_none());

        let record = registry.lookup(appt.tracking_code.as_str()).unwrap();
        assert_eq!(record.appointment_id, appt.id);
        assert_eq!(record.service_name, "Oil Change");
        assert_eq!(repo.find_by_tracking_code(appt.tracking_code.as_str()).unwrap(), appt);
    }

    #[test]
    fn test_book_rejects_taken_and_out_of_hours_slots() {
        let (repo, registry) = repo();
        repo.book(request(15, 13)).unwrap();

        for bad in [request(15, 13), request(15, 8), request(15, 19)] {
            let err = repo.book(bad).unwrap_err();
            assert!(matches!(
                err,
                StoreError::Core(CoreError::SlotUnavailable { .. })
            ));
        }
        let mut half_hour = request(15, 13);
        half_hour.scheduled_time = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert!(repo.book(half_hour).is_err());

        // Rejected bookings never mint a code
        assert_eq!(registry.stats().unwrap().total, 1);
    }

    #[test]
    fn test_book_rejects_negative_service_cost() {
        let (repo, registry) = repo();
        let mut bad = request(15, 10);
        bad.service_cost_cents = -1;
        assert!(matches!(
            repo.book(bad).unwrap_err(),
            StoreError::Core(CoreError::InvalidAmount { .. })
        ));
        assert_eq!(registry.stats().unwrap().total, 0);
    }

    #[test]
    fn test_available_slots() {
        let (repo, _) = repo();
        repo.book(request(15, 13)).unwrap();

        let slots = repo.available_slots(date(15)).unwrap();
        assert_eq!(slots.len(), 9);
        assert!(!slots.iter().any(|s| s == "13:00:00"));
        assert_eq!(repo.available_slots(date(16)).unwrap().len(), 10);
    }

    #[test]
    fn test_cancelling_frees_slot_and_mirrors_status() {
        let (repo, registry) = repo();
        let appt = repo.book(request(15, 13)).unwrap();

        repo.update_status(&appt.id, AppointmentUpdate::to(AppointmentStatus::Cancelled))
            .unwrap();

        assert_eq!(repo.available_slots(date(15)).unwrap().len(), 10);
        assert_eq!(
            registry.lookup(appt.tracking_code.as_str()).unwrap().status,
            AppointmentStatus::Cancelled
        );
        // The cancelled code is never reissued; the slot can be rebooked
        let again = repo.book(request(15, 13)).unwrap();
        assert_ne!(again.tracking_code, appt.tracking_code);
    }

    #[test]
    fn test_full_lifecycle() {
        let (repo, registry) = repo();
        let appt = repo.book(request(15, 10)).unwrap();

        let started = repo
            .update_status(
                &appt.id,
                AppointmentUpdate::to(AppointmentStatus::InProgress).with_notes("on the lift"),
            )
            .unwrap();
        assert_eq!(started.status, AppointmentStatus::InProgress);

        let done = repo
            .update_status(
                &appt.id,
                AppointmentUpdate::to(AppointmentStatus::Completed).with_parts_cost(2500),
            )
            .unwrap();
        assert_eq!(done.total_cost_cents, 7499);
        assert_eq!(done.actual_completion, Some(now()));
        assert_eq!(done.work_notes.as_deref(), Some("on the lift"));
        assert_eq!(
            registry.lookup(appt.tracking_code.as_str()).unwrap().status,
            AppointmentStatus::Completed
        );
    }

    #[test]
    fn test_illegal_transition_leaves_record_and_registry_untouched() {
        let (repo, registry) = repo();
        let appt = repo.book(request(15, 10)).unwrap();
        repo.update_status(&appt.id, AppointmentUpdate::to(AppointmentStatus::InProgress))
            .unwrap();
        let done = repo
            .update_status(&appt.id, AppointmentUpdate::to(AppointmentStatus::Completed))
            .unwrap();

        let err = repo
            .update_status(
                &appt.id,
                AppointmentUpdate::to(AppointmentStatus::InProgress).with_parts_cost(100),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::IllegalTransition { .. })
        ));
        assert_eq!(repo.get(&appt.id).unwrap(), done);
        assert_eq!(
            registry.lookup(appt.tracking_code.as_str()).unwrap().status,
            AppointmentStatus::Completed
        );
    }

    /// Tracking store whose updates always fail.
    struct BrokenUpdates(MemoryStore<TrackingRecord>);

    impl RecordStore<TrackingRecord> for BrokenUpdates {
        fn get(&self, key: &str) -> StoreResult<Option<TrackingRecord>> {
            self.0.get(key)
        }

        fn put(&self, value: TrackingRecord) -> StoreResult<()> {
            self.0.put(value)
        }

        fn insert_new(&self, value: TrackingRecord) -> StoreResult<bool> {
            self.0.insert_new(value)
        }

        fn update(
            &self,
            _key: &str,
            _apply: &mut dyn FnMut(&TrackingRecord) -> CoreResult<TrackingRecord>,
        ) -> StoreResult<Option<TrackingRecord>> {
            Err(StoreError::LockPoisoned)
        }

        fn scan(&self) -> StoreResult<Vec<TrackingRecord>> {
            self.0.scan()
        }
    }

    #[test]
    fn test_registry_failure_does_not_fail_committed_update() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        let tracking: Arc<dyn RecordStore<TrackingRecord>> =
            Arc::new(BrokenUpdates(MemoryStore::new()));
        let registry = CodeRegistry::new(tracking, Arc::clone(&clock), CodeGenerator::default(), 10);
        let repo = AppointmentRepository::new(
            Arc::new(MemoryStore::<Appointment>::new()),
            registry.clone(),
            clock,
            BusinessHours::default(),
        );
        let appt = repo.book(request(15, 10)).unwrap();

        let started = repo
            .update_status(&appt.id, AppointmentUpdate::to(AppointmentStatus::InProgress))
            .unwrap();
        assert_eq!(started.status, AppointmentStatus::InProgress);
        assert_eq!(repo.get(&appt.id).unwrap(), started);
        // The registry keeps its last good status
        assert_eq!(
            registry.lookup(appt.tracking_code.as_str()).unwrap().status,
            AppointmentStatus::Scheduled
        );
    }

    #[test]
    fn test_unknown_ids() {
        let (repo, _) = repo();
        assert!(repo
            .update_status("nope", AppointmentUpdate::to(AppointmentStatus::Cancelled))
            .unwrap_err()
            .is_not_found());
        assert!(repo.get("nope").unwrap_err().is_not_found());
        assert!(repo
            .find_by_tracking_code("MC-2024-12")
            .unwrap_err()
            .is_invalid_format());
        assert!(repo
            .find_by_tracking_code("MC-2024-000012")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_listing() {
        let (repo, _) = repo();
        let a = repo.book(request(16, 11)).unwrap();
        let b = repo.book(request(15, 9)).unwrap();
        let c = repo.book(request(18, 9)).unwrap();
        repo.update_status(&c.id, AppointmentUpdate::to(AppointmentStatus::Cancelled))
            .unwrap();

        let range = repo.list_by_date_range(date(15), date(16)).unwrap();
        assert_eq!(
            range.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            vec![b.id.as_str(), a.id.as_str()]
        );
        assert!(repo.list_by_date_range(date(17), date(15)).unwrap().is_empty());

        assert_eq!(repo.list_by_status(AppointmentStatus::Scheduled).unwrap().len(), 2);
        assert_eq!(repo.todays(date(18)).unwrap().len(), 0);
        assert_eq!(repo.todays(date(15)).unwrap().len(), 1);
        assert_eq!(repo.upcoming(date(16)).unwrap().len(), 1);
        assert_eq!(repo.all().unwrap().len(), 3);
    }

    #[test]
    fn test_estimated_completion() {
        let (repo, _) = repo();
        let appt = repo.book(request(15, 10)).unwrap();
        let pickup = Utc.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap();

        let updated = repo.set_estimated_completion(&appt.id, pickup).unwrap();
        assert_eq!(updated.estimated_completion, Some(pickup));

        repo.update_status(&appt.id, AppointmentUpdate::to(AppointmentStatus::Cancelled))
            .unwrap();
        assert!(repo.set_estimated_completion(&appt.id, pickup).is_err());
    }
}
