//! # Code Registry
//!
//! Owns the mapping tracking code → tracking record.
//!
//! ## Issuance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    issue(customer, service, appointment_id)             │
//! │                                                                         │
//! │  scan() ──► issued set ──► CodeGenerator::generate_with(set, now)       │
//! │                                   │                                     │
//! │                 ┌─────────────────┴──────────────────┐                  │
//! │                 ▼                                    ▼                  │
//! │            Unique(code)                    Fallback { code }            │
//! │                 │                                    │ warn!            │
//! │                 ▼                                    ▼                  │
//! │        insert_new(record)                   insert_new(record)          │
//! │         │            │                       │              │           │
//! │       true         false                   true           false         │
//! │         │            │                       │              │           │
//! │      issued    another caller won        issued     GenerationExhausted │
//! │                the code: rescan + retry             (never a duplicate) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `insert_new` is the single atomic check-and-insert, so two concurrent
//! bookings can never leave with the same code.

use chrono::{Datelike, FixedOffset, Offset, Utc};
use garage_core::metrics::{local_date, week_bounds};
use garage_core::tracking::{self as codes, CodeGenerator, GeneratedCode};
use garage_core::{AppointmentStatus, Clock, CoreError, CustomerInfo, TrackingCode, TrackingRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::RecordStore;
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Results
// =============================================================================

/// Registry overview for the admin screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_year: BTreeMap<i32, usize>,
    /// Created on or after the first of the current local month.
    pub this_month: usize,
    /// Created on or after the Sunday starting the current local week.
    pub this_week: usize,
    /// Newest first.
    pub recent_codes: Vec<TrackingRecord>,
}

/// Answer for the tracking portal's "is this my code?" check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCheck {
    pub is_valid: bool,
    pub exists: bool,
    pub record: Option<TrackingRecord>,
}

// =============================================================================
// Code Registry
// =============================================================================

/// Tracking code issuance, lookup and search.
#[derive(Clone)]
pub struct CodeRegistry {
    store: Arc<dyn RecordStore<TrackingRecord>>,
    clock: Arc<dyn Clock>,
    generator: CodeGenerator,
    recent_limit: usize,
    offset: FixedOffset,
}

impl CodeRegistry {
    pub fn new(
        store: Arc<dyn RecordStore<TrackingRecord>>,
        clock: Arc<dyn Clock>,
        generator: CodeGenerator,
        recent_limit: usize,
    ) -> Self {
        CodeRegistry {
            store,
            clock,
            generator,
            recent_limit,
            offset: Utc.fix(),
        }
    }

    /// Local calendar for the month and week windows in [`stats`](Self::stats).
    /// Defaults to UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    fn issued_codes(&self) -> StoreResult<HashSet<String>> {
        Ok(self
            .store
            .scan()?
            .into_iter()
            .map(|record| record.tracking_code.into())
            .collect())
    }

    /// Mints a code for a new appointment and stores its record as
    /// `scheduled`.
    ///
    /// ## Returns
    /// - `Unique(code)` on the normal path
    /// - `Fallback { code, .. }` when the generator ran out of attempts but
    ///   the timestamp code was still free
    ///
    /// ## Errors
    /// `GenerationExhausted` if even the fallback code is taken.
    pub fn issue(
        &self,
        customer: &CustomerInfo,
        service_name: &str,
        appointment_id: &str,
    ) -> StoreResult<GeneratedCode> {
        let mut rng = rand::thread_rng();

        for race in 0..self.generator.max_attempts().max(1) {
            let now = self.clock.now();
            let issued = self.issued_codes()?;
            let generated = self.generator.generate_with(&issued, now, &mut rng);

            let record = TrackingRecord {
                tracking_code: generated.code().clone(),
                appointment_id: appointment_id.to_string(),
                customer_name: customer.name.clone(),
                customer_email: customer.email.clone(),
                service_name: service_name.to_string(),
                status: AppointmentStatus::Scheduled,
                created_at: now,
                updated_at: now,
            };

            let inserted = self.store.insert_new(record)?;
            match (generated, inserted) {
                (GeneratedCode::Unique(code), true) => {
                    info!(code = %code, appointment_id = %appointment_id, "Tracking code issued");
                    return Ok(GeneratedCode::Unique(code));
                }
                (GeneratedCode::Unique(code), false) => {
                    debug!(code = %code, race, "Tracking code taken concurrently, retrying");
                }
                (GeneratedCode::Fallback { code, attempts }, true) => {
                    warn!(
                        code = %code,
                        attempts,
                        appointment_id = %appointment_id,
                        "Tracking code generation exhausted, issued timestamp fallback"
                    );
                    return Ok(GeneratedCode::Fallback { code, attempts });
                }
                (GeneratedCode::Fallback { code, attempts }, false) => {
                    warn!(
                        code = %code,
                        attempts,
                        "Tracking code generation exhausted and fallback already issued"
                    );
                    return Err(CoreError::GenerationExhausted {
                        attempts,
                        fallback: code.into(),
                    }
                    .into());
                }
            }
        }

        Err(CoreError::GenerationExhausted {
            attempts: self.generator.max_attempts(),
            fallback: String::new(),
        }
        .into())
    }

    /// Finds the record behind a code.
    ///
    /// ## Errors
    /// - `InvalidFormat` before any read if the code is malformed
    /// - `NotFound` for a well-formed code that was never issued
    pub fn lookup(&self, code: &str) -> StoreResult<TrackingRecord> {
        let code = TrackingCode::parse(code)?;
        self.store
            .get(code.as_str())?
            .ok_or_else(|| StoreError::not_found("TrackingRecord", code.as_str()))
    }

    /// Overwrites the mirrored status. Returns `false` for unknown codes.
    ///
    /// This is a plain store: transition rules live with the appointment.
    pub fn update_status(&self, code: &str, status: AppointmentStatus) -> StoreResult<bool> {
        if !codes::validate(code) {
            return Ok(false);
        }
        let now = self.clock.now();
        let updated = self.store.update(code, &mut |current| {
            let mut next = current.clone();
            next.status = status;
            next.updated_at = now;
            Ok(next)
        })?;

        if updated.is_some() {
            debug!(code = %code, status = %status, "Tracking status updated");
        }
        Ok(updated.is_some())
    }

    /// Case-insensitive substring search over code, customer name, email and
    /// service name.
    ///
    /// The iterator runs over a snapshot taken by this call; clone it to walk
    /// the same results again, or call `search` again to see new records.
    pub fn search(
        &self,
        query: &str,
    ) -> StoreResult<impl Iterator<Item = TrackingRecord> + Clone> {
        let needle = query.to_lowercase();
        let snapshot = self.store.scan()?;
        Ok(snapshot
            .into_iter()
            .filter(move |record| record.matches(&needle)))
    }

    pub fn stats(&self) -> StoreResult<RegistryStats> {
        let mut records = self.store.scan()?;

        let today = local_date(self.clock.now(), self.offset);
        let (week_start, _) = week_bounds(today);
        let month_start = today.with_day(1).unwrap_or(today);

        let mut by_status = BTreeMap::new();
        let mut by_year = BTreeMap::new();
        let (mut this_month, mut this_week) = (0, 0);
        for record in &records {
            *by_status.entry(record.status.to_string()).or_insert(0) += 1;
            *by_year.entry(record.tracking_code.year()).or_insert(0) += 1;

            let created = local_date(record.created_at, self.offset);
            if created >= month_start {
                this_month += 1;
            }
            if created >= week_start {
                this_week += 1;
            }
        }

        let total = records.len();
        sort_newest_first(&mut records);
        records.truncate(self.recent_limit);

        Ok(RegistryStats {
            total,
            by_status,
            by_year,
            this_month,
            this_week,
            recent_codes: records,
        })
    }

    /// Every record for a customer email, newest first.
    pub fn for_customer(&self, email: &str) -> StoreResult<Vec<TrackingRecord>> {
        let email = email.trim().to_lowercase();
        let mut records: Vec<TrackingRecord> = self
            .store
            .scan()?
            .into_iter()
            .filter(|record| record.customer_email.to_lowercase() == email)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub fn list_by_status(&self, status: AppointmentStatus) -> StoreResult<Vec<TrackingRecord>> {
        let mut records: Vec<TrackingRecord> = self
            .store
            .scan()?
            .into_iter()
            .filter(|record| record.status == status)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Format and existence check that never fails on malformed input.
    pub fn check(&self, code: &str) -> StoreResult<CodeCheck> {
        if !codes::validate(code) {
            return Ok(CodeCheck {
                is_valid: false,
                exists: false,
                record: None,
            });
        }
        let record = self.store.get(code)?;
        Ok(CodeCheck {
            is_valid: true,
            exists: record.is_some(),
            record,
        })
    }

    /// Number of codes issued in the clock's current year.
    pub fn issued_this_year(&self) -> StoreResult<usize> {
        let year = self.clock.now().year();
        Ok(self
            .store
            .scan()?
            .iter()
            .filter(|record| record.tracking_code.year() == year)
            .count())
    }

    /// Pretty JSON backup of every record, oldest first.
    pub fn export_json(&self) -> StoreResult<String> {
        let mut records = self.store.scan()?;
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.tracking_code.cmp(&b.tracking_code))
        });
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Restores a backup. Codes already present are left alone.
    ///
    /// Returns how many records were added.
    pub fn import_json(&self, json: &str) -> StoreResult<usize> {
        let records: Vec<TrackingRecord> = serde_json::from_str(json)?;
        let mut added = 0;
        for record in records {
            if self.store.insert_new(record)? {
                added += 1;
            }
        }
        info!(added, "Tracking records imported");
        Ok(added)
    }
}

fn sort_newest_first(records: &mut [TrackingRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.tracking_code.cmp(&a.tracking_code))
    });
}

// =============================================================================
// Unit Tests
// =============================================================================
