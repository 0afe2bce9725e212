//! # Repository Module
//!
//! Record store abstraction and the repositories built on it.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  shop.appointments().update_status(id, update)                  │
//! │       ▼                                                                 │
//! │  AppointmentRepository / PaymentRepository / CodeRegistry               │
//! │  ├── validate input (garage-core)                                       │
//! │  ├── store.update(key, transition)   ← atomic read-modify-write         │
//! │  └── log the outcome                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  dyn RecordStore<T>                                                     │
//! │  ├── get / put / scan                                                   │
//! │  ├── insert_new   (check-and-insert, backs code issuance)               │
//! │  └── update       (no write when the closure fails)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MemoryStore<T> (default) or any external CRUD backend                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CodeRegistry`](tracking::CodeRegistry) - Tracking code issuance and lookup
//! - [`AppointmentRepository`](appointment::AppointmentRepository) - Booking and appointment lifecycle
//! - [`PaymentRepository`](payment::PaymentRepository) - Payment lifecycle and financial stats

pub mod appointment;
pub mod payment;
pub mod tracking;

use garage_core::{Appointment, CoreResult, Payment, Testimonial, TrackingRecord};
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Record Store
// =============================================================================

/// A value that can live in a [`RecordStore`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary key.
    fn key(&self) -> &str;
}

impl Record for TrackingRecord {
    fn key(&self) -> &str {
        self.tracking_code.as_str()
    }
}

impl Record for Appointment {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Payment {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Testimonial {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Keyed CRUD over one record type.
///
/// Implementations must make `insert_new` and `update` atomic with respect
/// to other calls on the same store.
pub trait RecordStore<T: Record>: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<T>>;

    /// Inserts or replaces.
    fn put(&self, value: T) -> StoreResult<()>;

    /// Inserts only if the key is free. Returns `false` if it was taken.
    fn insert_new(&self, value: T) -> StoreResult<bool>;

    /// Replaces the record with `apply(current)`.
    ///
    /// Returns `Ok(None)` for an unknown key. If `apply` fails nothing is
    /// written and the error is returned.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(&T) -> CoreResult<T>,
    ) -> StoreResult<Option<T>>;

    /// Snapshot of every record, in key order.
    fn scan(&self) -> StoreResult<Vec<T>>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store backed by an ordered map.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RwLock<BTreeMap<String, T>>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Pre-populated store (tests, restores).
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.key().to_string(), record))
            .collect();
        MemoryStore {
            records: RwLock::new(map),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn get(&self, key: &str) -> StoreResult<Option<T>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(key).cloned())
    }

    fn put(&self, value: T) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(value.key().to_string(), value);
        Ok(())
    }

    fn insert_new(&self, value: T) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        if records.contains_key(value.key()) {
            return Ok(false);
        }
        records.insert(value.key().to_string(), value);
        Ok(true)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(&T) -> CoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(current) = records.get(key) else {
            return Ok(None);
        };
        let next = apply(current)?;
        records.insert(key.to_string(), next.clone());
        Ok(Some(next))
    }

    fn scan(&self) -> StoreResult<Vec<T>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
