//! # Metrics Module
//!
//! Read-side folds over appointments, payments and testimonials.
//!
//! Everything here is a pure function of its inputs and an explicit `now`.
//! Nothing is cached; every dashboard request recomputes from the current
//! collections.
//!
//! ## Calendar
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  All windows use the shop's local calendar (a fixed UTC offset).        │
//! │                                                                         │
//! │  Week:   Sun ─ Mon ─ Tue ─ Wed ─ Thu ─ Fri ─ Sat   (closed interval)    │
//! │           ▲                                   ▲                         │
//! │     start_of_week                       end_of_week                     │
//! │                                                                         │
//! │  Month:  same local year and month as `now`                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Averages
//! Every mean goes through [`mean_or_zero`]: an empty input reports `0.0`
//! rather than `NaN`, and results are rounded to one decimal by [`round1`].

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    Appointment, AppointmentStatus, Payment, PaymentStatus, ServiceCatalogEntry, Testimonial,
};

// =============================================================================
// Calendar Helpers
// =============================================================================

/// Mean of `values`, or `0.0` when there are none.
pub fn mean_or_zero<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Local calendar date of an instant.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Sunday and Saturday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = u64::from(day.weekday().num_days_from_sunday());
    let start = day.checked_sub_days(Days::new(back)).unwrap_or(day);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
    (start, end)
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// When an appointment was booked for, as an instant.
pub fn scheduled_at(appointment: &Appointment, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = appointment
        .scheduled_date
        .and_time(appointment.scheduled_time);
    offset
        .from_local_datetime(&local)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

/// Hours from the booked slot to the actual completion.
fn completion_hours(appointment: &Appointment, offset: FixedOffset) -> Option<f64> {
    let finished = appointment.actual_completion?;
    let started = scheduled_at(appointment, offset)?;
    Some((finished - started).num_seconds() as f64 / 3600.0)
}

// =============================================================================
// Shop Metrics
// =============================================================================

/// Operational indicators for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopMetrics {
    pub pending_appointments: usize,
    pub in_progress_services: usize,
    pub completed_this_week: usize,
    pub monthly_revenue_cents: i64,
    pub average_completion_time_hours: f64,
    pub customer_satisfaction: f64,
}

impl ShopMetrics {
    /// Folds the current collections into the dashboard figures.
    ///
    /// ## Windows
    /// - `completed_this_week`: `actual_completion` falls on a local date in
    ///   `[Sunday, Saturday]` of the current week
    /// - `monthly_revenue`: paid payments whose `payment_date` is in the
    ///   current local month
    pub fn compute(
        appointments: &[Appointment],
        payments: &[Payment],
        testimonials: &[Testimonial],
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        let today = local_date(now, offset);
        let (week_start, week_end) = week_bounds(today);

        let count_status = |status: AppointmentStatus| {
            appointments
                .iter()
                .filter(|appt| appt.status == status)
                .count()
        };

        let completed: Vec<&Appointment> = appointments
            .iter()
            .filter(|appt| appt.status == AppointmentStatus::Completed)
            .collect();

        let completed_this_week = completed
            .iter()
            .filter_map(|appt| appt.actual_completion)
            .map(|at| local_date(at, offset))
            .filter(|day| (week_start..=week_end).contains(day))
            .count();

        let monthly_revenue: Money = payments
            .iter()
            .filter(|payment| payment.status == PaymentStatus::Paid)
            .filter(|payment| {
                payment
                    .payment_date
                    .map(|at| same_month(local_date(at, offset), today))
                    .unwrap_or(false)
            })
            .map(Payment::total_amount)
            .sum();

        let average_completion_time_hours = round1(mean_or_zero(
            completed
                .iter()
                .filter_map(|appt| completion_hours(appt, offset)),
        ));

        let customer_satisfaction = round1(mean_or_zero(
            testimonials.iter().map(|t| f64::from(t.rating)),
        ));

        ShopMetrics {
            pending_appointments: count_status(AppointmentStatus::Scheduled),
            in_progress_services: count_status(AppointmentStatus::InProgress),
            completed_this_week,
            monthly_revenue_cents: monthly_revenue.cents(),
            average_completion_time_hours,
            customer_satisfaction,
        }
    }

    #[inline]
    pub fn monthly_revenue(&self) -> Money {
        Money::from_cents(self.monthly_revenue_cents)
    }
}

// =============================================================================
// Payment Stats
// =============================================================================

/// Revenue for one local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyRevenue {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub revenue_cents: i64,
}

/// Financial summary over a set of payments.
///
/// Component totals cover every payment; revenue counts only paid ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentStats {
    pub total_revenue_cents: i64,
    pub pending_amount_cents: i64,
    pub service_costs_total_cents: i64,
    pub parts_costs_total_cents: i64,
    pub labor_costs_total_cents: i64,
    pub tax_total_cents: i64,
    pub discount_total_cents: i64,
    pub paid_count: usize,
    pub pending_count: usize,
    pub partial_count: usize,
    pub failed_count: usize,
    pub refunded_count: usize,
    pub total_transactions: usize,
    /// Revenue per paid payment; zero when nothing is paid.
    pub average_transaction_value_cents: i64,
    /// Last seven local days, oldest first.
    pub daily_revenue: Vec<DailyRevenue>,
}

impl PaymentStats {
    pub fn compute(payments: &[Payment], now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let count = |status: PaymentStatus| payments.iter().filter(|p| p.status == status).count();
        let total = |field: fn(&Payment) -> i64| -> i64 { payments.iter().map(field).sum() };

        let paid: Vec<&Payment> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .collect();
        let total_revenue: Money = paid.iter().map(|p| p.amount_paid()).sum();
        let pending_amount: Money = payments
            .iter()
            .filter(|p| p.status.is_open())
            .map(Payment::amount_due)
            .sum();

        let today = local_date(now, offset);
        let daily_revenue = (0..7u64)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| {
                let revenue: Money = paid
                    .iter()
                    .filter(|p| local_date(p.payment_date.unwrap_or(p.created_at), offset) == date)
                    .map(|p| p.amount_paid())
                    .sum();
                DailyRevenue {
                    date,
                    revenue_cents: revenue.cents(),
                }
            })
            .collect();

        PaymentStats {
            total_revenue_cents: total_revenue.cents(),
            pending_amount_cents: pending_amount.cents(),
            service_costs_total_cents: total(|p| p.service_cost_cents),
            parts_costs_total_cents: total(|p| p.parts_cost_cents),
            labor_costs_total_cents: total(|p| p.labor_cost_cents),
            tax_total_cents: total(|p| p.tax_amount_cents),
            discount_total_cents: total(|p| p.discount_amount_cents),
            paid_count: paid.len(),
            pending_count: count(PaymentStatus::Pending),
            partial_count: count(PaymentStatus::Partial),
            failed_count: count(PaymentStatus::Failed),
            refunded_count: count(PaymentStatus::Refunded),
            total_transactions: payments.len(),
            average_transaction_value_cents: total_revenue.div_round(paid.len()).cents(),
            daily_revenue,
        }
    }
}

// =============================================================================
// Service Stats
// =============================================================================

/// Per-service performance for the catalog admin page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceStats {
    pub service_id: String,
    pub service_name: String,
    pub total_completed: usize,
    /// Mean actual duration, or the catalog estimate if nothing completed.
    pub average_time_minutes: f64,
    pub total_revenue_cents: i64,
    pub customer_rating: f64,
}

impl ServiceStats {
    pub fn compute(
        entry: &ServiceCatalogEntry,
        appointments: &[Appointment],
        payments: &[Payment],
        testimonials: &[Testimonial],
        offset: FixedOffset,
    ) -> Self {
        let completed: Vec<&Appointment> = appointments
            .iter()
            .filter(|appt| {
                appt.service_id == entry.id && appt.status == AppointmentStatus::Completed
            })
            .collect();
        let completed_ids: HashSet<&str> = completed.iter().map(|appt| appt.id.as_str()).collect();

        let durations: Vec<f64> = completed
            .iter()
            .filter_map(|appt| completion_hours(appt, offset))
            .map(|hours| hours * 60.0)
            .collect();
        let average_time_minutes = if durations.is_empty() {
            f64::from(entry.estimated_minutes)
        } else {
            round1(mean_or_zero(durations))
        };

        let total_revenue: Money = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .filter(|p| {
                p.appointment_id
                    .as_deref()
                    .map(|id| completed_ids.contains(id))
                    .unwrap_or(false)
            })
            .map(Payment::total_amount)
            .sum();

        let name = entry.name.to_lowercase();
        let customer_rating = round1(mean_or_zero(
            testimonials
                .iter()
                .filter(|t| t.service_type.to_lowercase().contains(&name))
                .map(|t| f64::from(t.rating)),
        ));

        ServiceStats {
            service_id: entry.id.clone(),
            service_name: entry.name.clone(),
            total_completed: completed.len(),
            average_time_minutes,
            total_revenue_cents: total_revenue.cents(),
            customer_rating,
        }
    }
}

// =============================================================================
// Dashboard Overview
// =============================================================================

/// Counters for the admin landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardOverview {
    /// Live bookings on today's local date.
    pub todays_appointments: usize,
    /// In progress, or still scheduled for today or earlier.
    pub urgent_items: usize,
    /// Payments still waiting for money.
    pub pending_payments: usize,
}

impl DashboardOverview {
    pub fn compute(
        appointments: &[Appointment],
        payments: &[Payment],
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        let today = local_date(now, offset);

        DashboardOverview {
            todays_appointments: appointments
                .iter()
                .filter(|appt| appt.occupies_slot() && appt.scheduled_date == today)
                .count(),
            urgent_items: appointments
                .iter()
                .filter(|appt| match appt.status {
                    AppointmentStatus::InProgress => true,
                    AppointmentStatus::Scheduled => appt.scheduled_date <= today,
                    AppointmentStatus::Completed | AppointmentStatus::Cancelled => false,
                })
                .count(),
            pending_payments: payments.iter().filter(|p| p.status.is_open()).count(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{
        apply_appointment_update, apply_payment_event, open_appointment, open_payment,
        AppointmentUpdate, PaymentEvent,
    };
    use crate::tracking::TrackingCode;
    use crate::types::{CustomerInfo, NewAppointment, NewPayment, VehicleDetails};
    use chrono::{NaiveTime, Weekday};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    /// Wednesday.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 17, 12, 0, 0).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn booked(id: &str, service: &str, day: u32, hour: u32) -> Appointment {
        let request = NewAppointment {
            customer: CustomerInfo {
                name: "Sam Lee".to_string(),
                email: "sam@example.com".to_string(),
                phone: None,
            },
            vehicle: VehicleDetails {
                make: "Ford".to_string(),
                model: "Focus".to_string(),
                year: 2016,
                license_plate: "FOC-001".to_string(),
                mileage: 90_000,
            },
            service_id: service.to_string(),
            service_name: service.to_string(),
            service_cost_cents: 10000,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            work_notes: None,
        };
        let code = TrackingCode::parse("MC-2024-000001").unwrap();
        open_appointment(id.to_string(), code, request, at(1, 0)).unwrap()
    }

    fn completed(id: &str, service: &str, day: u32, hour: u32, done: DateTime<Utc>) -> Appointment {
        let appt = booked(id, service, day, hour);
        let started = apply_appointment_update(
            &appt,
            &AppointmentUpdate::to(AppointmentStatus::InProgress),
            done,
        )
        .unwrap();
        apply_appointment_update(
            &started,
            &AppointmentUpdate::to(AppointmentStatus::Completed),
            done,
        )
        .unwrap()
    }

    fn paid(total: i64, appointment_id: Option<&str>, when: DateTime<Utc>) -> Payment {
        let request = NewPayment {
            appointment_id: appointment_id.map(str::to_string),
            service_cost_cents: total,
            ..NewPayment::default()
        };
        let payment = open_payment(format!("pay-{}", total), &request, at(1, 0)).unwrap();
        apply_payment_event(&payment, PaymentEvent::Settle, when).unwrap()
    }

    fn review(rating: u8, service_type: &str) -> Testimonial {
        Testimonial {
            id: format!("t-{}", rating),
            rating,
            service_type: service_type.to_string(),
            date_created: at(2, 0),
        }
    }

    #[test]
    fn test_mean_or_zero() {
        assert_eq!(mean_or_zero(Vec::<f64>::new()), 0.0);
        assert_eq!(mean_or_zero([4.0, 5.0]), 4.5);
        assert_eq!(round1(4.666), 4.7);
    }

    #[test]
    fn test_week_bounds_start_sunday() {
        let (start, end) = week_bounds(NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(start.weekday(), Weekday::Sun);
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(week_bounds(sunday).0, sunday);
    }

    #[test]
    fn test_empty_inputs_report_zero() {
        let metrics = ShopMetrics::compute(&[], &[], &[], now(), utc());
        assert_eq!(metrics.pending_appointments, 0);
        assert_eq!(metrics.completed_this_week, 0);
        assert_eq!(metrics.monthly_revenue_cents, 0);
        assert_eq!(metrics.average_completion_time_hours, 0.0);
        assert_eq!(metrics.customer_satisfaction, 0.0);

        let stats = PaymentStats::compute(&[], now(), utc());
        assert_eq!(stats.average_transaction_value_cents, 0);
        assert_eq!(stats.daily_revenue.len(), 7);
    }

    #[test]
    fn test_monthly_revenue_scenario() {
        let payments = vec![
            paid(10000, None, at(5, 10)),
            paid(5500, None, at(16, 10)),
            // December: outside the month
            paid(2500, None, Utc.with_ymd_and_hms(2023, 12, 31, 10, 0, 0).unwrap()),
        ];
        let metrics = ShopMetrics::compute(&[], &payments, &[], now(), utc());
        assert_eq!(metrics.monthly_revenue_cents, 15500);
        assert_eq!(metrics.monthly_revenue().to_string(), "$155.00");
    }

    #[test]
    fn test_status_counts_and_week_window() {
        let appointments = vec![
            booked("a1", "oil", 18, 9),
            booked("a2", "oil", 19, 10),
            apply_appointment_update(
                &booked("a3", "oil", 17, 9),
                &AppointmentUpdate::to(AppointmentStatus::InProgress),
                at(17, 9),
            )
            .unwrap(),
            // Sunday and Saturday bound the week
            completed("a4", "oil", 14, 9, at(14, 11)),
            completed("a5", "oil", 17, 9, at(20, 23)),
            // previous Saturday
            completed("a6", "oil", 13, 9, at(13, 12)),
        ];
        let metrics = ShopMetrics::compute(&appointments, &[], &[], now(), utc());
        assert_eq!(metrics.pending_appointments, 2);
        assert_eq!(metrics.in_progress_services, 1);
        assert_eq!(metrics.completed_this_week, 2);
    }

    #[test]
    fn test_week_window_follows_local_calendar() {
        // 2024-01-14 02:00 UTC is still Saturday the 13th at UTC-5
        let appointments = vec![completed("a1", "oil", 13, 9, at(14, 2))];
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let metrics = ShopMetrics::compute(&appointments, &[], &[], now(), eastern);
        assert_eq!(metrics.completed_this_week, 0);

        let metrics = ShopMetrics::compute(&appointments, &[], &[], now(), utc());
        assert_eq!(metrics.completed_this_week, 1);
    }

    #[test]
    fn test_average_completion_and_satisfaction() {
        let appointments = vec![
            completed("a1", "oil", 15, 9, at(15, 11)),
            completed("a2", "oil", 15, 10, at(15, 13)),
            completed("a3", "oil", 15, 11, at(15, 13)),
        ];
        let testimonials = vec![review(5, "Oil"), review(4, "Brakes"), review(5, "Oil")];

        let metrics = ShopMetrics::compute(&appointments, &[], &testimonials, now(), utc());
        // (2 + 3 + 2) / 3 = 2.33
        assert_eq!(metrics.average_completion_time_hours, 2.3);
        assert_eq!(metrics.customer_satisfaction, 4.7);
    }

    #[test]
    fn test_payment_stats() {
        let pending = open_payment(
            "pending".to_string(),
            &NewPayment {
                service_cost_cents: 8000,
                labor_cost_cents: 3000,
                tax_amount_cents: 500,
                ..NewPayment::default()
            },
            at(16, 8),
        )
        .unwrap();
        let partial =
            apply_payment_event(&pending, PaymentEvent::Receive { amount_cents: 2000 }, at(16, 9))
                .unwrap();
        let payments = vec![
            paid(10000, None, at(17, 10)),
            paid(5001, None, at(16, 10)),
            pending,
            partial,
        ];

        let stats = PaymentStats::compute(&payments, now(), utc());
        assert_eq!(stats.total_revenue_cents, 15001);
        assert_eq!(stats.pending_amount_cents, 8500 + 6500);
        assert_eq!(stats.paid_count, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.partial_count, 1);
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.labor_costs_total_cents, 6000);
        assert_eq!(stats.average_transaction_value_cents, 7501);

        let last = stats.daily_revenue.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(last.revenue_cents, 10000);
        assert_eq!(stats.daily_revenue[5].revenue_cents, 5001);
    }

    #[test]
    fn test_service_stats() {
        let entry = ServiceCatalogEntry {
            id: "oil".to_string(),
            name: "Oil Change".to_string(),
            price_cents: 4999,
            estimated_minutes: 30,
        };
        let appointments = vec![
            completed("a1", "oil", 15, 9, at(15, 10)),
            booked("a2", "oil", 18, 9),
            completed("a3", "brakes", 15, 9, at(15, 12)),
        ];
        let payments = vec![
            paid(4999, Some("a1"), at(15, 10)),
            paid(20000, Some("a3"), at(15, 12)),
        ];
        let testimonials = vec![review(4, "Full oil change"), review(2, "Brakes")];

        let stats = ServiceStats::compute(&entry, &appointments, &payments, &testimonials, utc());
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.average_time_minutes, 60.0);
        assert_eq!(stats.total_revenue_cents, 4999);
        assert_eq!(stats.customer_rating, 4.0);

        let idle = ServiceCatalogEntry {
            id: "detail".to_string(),
            name: "Detailing".to_string(),
            price_cents: 15000,
            estimated_minutes: 180,
        };
        let stats = ServiceStats::compute(&idle, &appointments, &payments, &testimonials, utc());
        assert_eq!(stats.total_completed, 0);
        assert_eq!(stats.average_time_minutes, 180.0);
        assert_eq!(stats.customer_rating, 0.0);
    }

    #[test]
    fn test_dashboard_overview() {
        let cancelled = apply_appointment_update(
            &booked("a4", "oil", 17, 15),
            &AppointmentUpdate::to(AppointmentStatus::Cancelled),
            at(16, 0),
        )
        .unwrap();
        let appointments = vec![
            booked("a1", "oil", 17, 9),
            booked("a2", "oil", 16, 9),
            booked("a3", "oil", 18, 9),
            cancelled,
        ];
        let payments = vec![paid(1000, None, at(17, 9))];

        let overview = DashboardOverview::compute(&appointments, &payments, now(), utc());
        assert_eq!(overview.todays_appointments, 1);
        assert_eq!(overview.urgent_items, 2);
        assert_eq!(overview.pending_payments, 0);
    }
}
