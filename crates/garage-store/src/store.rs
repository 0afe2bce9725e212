//! # Shop Handle
//!
//! Wires the record stores, clock and configuration into the repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shop Construction                                  │
//! │                                                                         │
//! │  ShopConfig::load_or_default(None) ← shop.toml + GARAGE_* env           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Shop::new(config)?          ← validates config, SystemClock            │
//! │  Shop::with_clock(config, clock)?   (tests: FixedClock)                 │
//! │  Shop::with_stores(config, clock, stores)?   (external backends)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────┐  ┌──────────────────────┐  ┌────────────────────┐     │
//! │  │ CodeRegistry │◄─│ AppointmentRepository│  │ PaymentRepository  │     │
//! │  └──────┬───────┘  └──────────┬───────────┘  └─────────┬──────────┘     │
//! │         ▼                     ▼                        ▼                │
//! │   RecordStore<Tracking>  RecordStore<Appointment>  RecordStore<Payment> │
//! │                                                                         │
//! │  shop.metrics() / overview() / service_stats() read all of them         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cloning a `Shop` is cheap; clones share the same stores.

use garage_core::metrics::{DashboardOverview, ServiceStats, ShopMetrics};
use garage_core::validation::validate_rating;
use garage_core::{
    Appointment, Clock, CoreError, Payment, ServiceCatalogEntry, SystemClock, Testimonial,
    TrackingRecord,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ShopConfig;
use crate::error::{StoreError, StoreResult};
use crate::repository::appointment::AppointmentRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::tracking::CodeRegistry;
use crate::repository::{MemoryStore, RecordStore};

// =============================================================================
// Stores
// =============================================================================

/// The four collections behind a shop.
///
/// `Default` gives fresh in-memory stores.
#[derive(Clone)]
pub struct ShopStores {
    pub tracking: Arc<dyn RecordStore<TrackingRecord>>,
    pub appointments: Arc<dyn RecordStore<Appointment>>,
    pub payments: Arc<dyn RecordStore<Payment>>,
    pub testimonials: Arc<dyn RecordStore<Testimonial>>,
}

impl Default for ShopStores {
    fn default() -> Self {
        ShopStores {
            tracking: Arc::new(MemoryStore::<TrackingRecord>::new()),
            appointments: Arc::new(MemoryStore::<Appointment>::new()),
            payments: Arc::new(MemoryStore::<Payment>::new()),
            testimonials: Arc::new(MemoryStore::<Testimonial>::new()),
        }
    }
}

// =============================================================================
// Shop
// =============================================================================

/// Main handle providing repository and dashboard access.
#[derive(Clone)]
pub struct Shop {
    config: ShopConfig,
    clock: Arc<dyn Clock>,
    registry: CodeRegistry,
    appointments: AppointmentRepository,
    payments: PaymentRepository,
    testimonials: Arc<dyn RecordStore<Testimonial>>,
}

impl Shop {
    /// In-memory shop on the system clock.
    pub fn new(config: ShopConfig) -> StoreResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ShopConfig, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        Self::with_stores(config, clock, ShopStores::default())
    }

    /// Shop over caller-supplied stores.
    ///
    /// ## Errors
    /// `Config` if the configuration is out of range.
    pub fn with_stores(
        config: ShopConfig,
        clock: Arc<dyn Clock>,
        stores: ShopStores,
    ) -> StoreResult<Self> {
        config.validate()?;

        let registry = CodeRegistry::new(
            stores.tracking,
            Arc::clone(&clock),
            config.generator(),
            config.codes.recent_limit,
        )
        .with_offset(config.offset());
        let appointments = AppointmentRepository::new(
            stores.appointments,
            registry.clone(),
            Arc::clone(&clock),
            config.business_hours(),
        );
        let payments = PaymentRepository::new(stores.payments, Arc::clone(&clock), config.offset());

        info!(
            open_hour = config.schedule.open_hour,
            close_hour = config.schedule.close_hour,
            utc_offset_minutes = config.calendar.utc_offset_minutes,
            "Shop ready"
        );

        Ok(Shop {
            config,
            clock,
            registry,
            appointments,
            payments,
            testimonials: stores.testimonials,
        })
    }

    /// Default configuration, system clock, empty stores (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        Self::new(ShopConfig::default())
    }

    // =========================================================================
    // Repository Accessors
    // =========================================================================

    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    pub fn appointments(&self) -> &AppointmentRepository {
        &self.appointments
    }

    pub fn payments(&self) -> &PaymentRepository {
        &self.payments
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // =========================================================================
    // Testimonials
    // =========================================================================

    /// Stores a customer rating (1-5).
    pub fn add_testimonial(
        &self,
        rating: u8,
        service_type: impl Into<String>,
    ) -> StoreResult<Testimonial> {
        validate_rating(rating).map_err(CoreError::from)?;

        let testimonial = Testimonial {
            id: Uuid::new_v4().to_string(),
            rating,
            service_type: service_type.into(),
            date_created: self.clock.now(),
        };
        if !self.testimonials.insert_new(testimonial.clone())? {
            return Err(StoreError::conflict("Testimonial", testimonial.id));
        }
        debug!(rating, service = %testimonial.service_type, "Testimonial added");
        Ok(testimonial)
    }

    pub fn testimonials(&self) -> StoreResult<Vec<Testimonial>> {
        self.testimonials.scan()
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    /// Headline KPIs, recomputed from the current collections.
    pub fn metrics(&self) -> StoreResult<ShopMetrics> {
        let appointments = self.appointments.all()?;
        let payments = self.payments.all()?;
        let testimonials = self.testimonials()?;
        Ok(ShopMetrics::compute(
            &appointments,
            &payments,
            &testimonials,
            self.clock.now(),
            self.config.offset(),
        ))
    }

    /// One [`ServiceStats`] per catalog entry, in catalog order.
    pub fn service_stats(&self, catalog: &[ServiceCatalogEntry]) -> StoreResult<Vec<ServiceStats>> {
        let appointments = self.appointments.all()?;
        let payments = self.payments.all()?;
        let testimonials = self.testimonials()?;
        let offset = self.config.offset();
        Ok(catalog
            .iter()
            .map(|entry| ServiceStats::compute(entry, &appointments, &payments, &testimonials, offset))
            .collect())
    }

    pub fn overview(&self) -> StoreResult<DashboardOverview> {
        let appointments = self.appointments.all()?;
        let payments = self.payments.all()?;
        Ok(DashboardOverview::compute(
            &appointments,
            &payments,
            self.clock.now(),
            self.config.offset(),
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
