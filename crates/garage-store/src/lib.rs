//! # garage-store: Record Layer for Garage Tracker
//!
//! This crate owns every read and write against the shop's records. Rules
//! come from `garage-core`; this crate applies them atomically against a
//! [`RecordStore`](repository::RecordStore) and logs the outcome.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Garage Tracker Data Flow                           │
//! │                                                                         │
//! │  Booking form / Tracking portal / Admin UI                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  garage-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌──────────────────┐   ┌──────────────┐   │   │
//! │  │   │     Shop      │   │   Repositories   │   │  ShopConfig  │   │   │
//! │  │   │  (store.rs)   │   │                  │   │  (shop.toml) │   │   │
//! │  │   │               │   │ CodeRegistry     │   │              │   │   │
//! │  │   │ clock, stores │◄──│ AppointmentRepo  │   │ hours, codes │   │   │
//! │  │   │ dashboards    │   │ PaymentRepo      │   │ utc offset   │   │   │
//! │  │   └───────────────┘   └──────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MemoryStore (default) or an external CRUD backend                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `Shop` handle and its stores
//! - [`repository`] - Record store trait and repositories
//! - [`config`] - shop.toml loading and environment overrides
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust
//! use garage_store::Shop;
//!
//! let shop = Shop::in_memory().unwrap();
//! assert_eq!(shop.registry().stats().unwrap().total, 0);
//! assert_eq!(shop.appointments().all().unwrap().len(), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ShopConfig;
pub use error::{StoreError, StoreResult};
pub use store::{Shop, ShopStores};

// Repository re-exports for convenience
pub use repository::appointment::AppointmentRepository;
pub use repository::payment::PaymentRepository;
pub use repository::tracking::{CodeCheck, CodeRegistry, RegistryStats};
pub use repository::{MemoryStore, Record, RecordStore};
