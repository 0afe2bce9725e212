//! # Seed Data Generator
//!
//! Fills an in-memory shop with demo bookings and prints the dashboards.
//!
//! ## Usage
//! ```bash
//! # Book 25 appointments (default)
//! cargo run -p garage-store --bin seed
//!
//! # Custom amount
//! cargo run -p garage-store --bin seed -- --count 100
//!
//! # Use a specific shop.toml
//! cargo run -p garage-store --bin seed -- --config ./shop.toml
//! ```
//!
//! ## Generated Data
//! Bookings fill the hourly slots from today onward. Every booking is then
//! driven to one of five outcomes by its index:
//! - left scheduled
//! - in progress
//! - completed and paid in full
//! - completed with a partial payment
//! - cancelled

use chrono::{Days, NaiveTime};
use garage_core::lifecycle::AppointmentUpdate;
use garage_core::metrics::local_date;
use garage_core::{
    AppointmentStatus, Clock, CustomerInfo, NewAppointment, NewPayment, ServiceCatalogEntry,
    VehicleDetails,
};
use garage_store::{Shop, ShopConfig};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Demo catalog: (id, name, price in cents, estimated minutes)
const CATALOG: &[(&str, &str, i64, u32)] = &[
    ("oil-change", "Oil Change", 4999, 45),
    ("brakes", "Brake Service", 15000, 120),
    ("tires", "Tire Rotation", 3500, 30),
    ("diagnostics", "Engine Diagnostics", 8999, 60),
    ("ac", "AC Recharge", 12000, 90),
];

const CUSTOMERS: &[&str] = &[
    "Alex Morgan",
    "Priya Shah",
    "Diego Alvarez",
    "Mei Chen",
    "Sam Okafor",
    "Jordan Blake",
    "Fatima Noor",
];

const VEHICLES: &[(&str, &str)] = &[
    ("Toyota", "Corolla"),
    ("Honda", "Civic"),
    ("Ford", "F-150"),
    ("Subaru", "Outback"),
    ("Tesla", "Model 3"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 25;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--config" | "-f" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Garage Tracker Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Appointments to book (default: 25)");
                println!("  -f, --config <PATH>  shop.toml to load (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = ShopConfig::load_or_default(config_path);
    let shop = Shop::new(config)?;

    println!("🔧 Garage Tracker Seed Data Generator");
    println!("=====================================");
    println!("Appointments: {}", count);
    println!();

    let catalog: Vec<ServiceCatalogEntry> = CATALOG
        .iter()
        .map(|(id, name, price_cents, minutes)| ServiceCatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            price_cents: *price_cents,
            estimated_minutes: *minutes,
        })
        .collect();

    let slots: Vec<NaiveTime> = shop.config().business_hours().slots().collect();
    let today = local_date(shop.clock().now(), shop.config().offset());

    let mut booked = 0;
    for index in 0..count {
        let day = (index / slots.len()) as u64;
        let Some(date) = today.checked_add_days(Days::new(day)) else {
            break;
        };
        let service = &catalog[index % catalog.len()];
        let customer = CUSTOMERS[index % CUSTOMERS.len()];
        let (make, model) = VEHICLES[index % VEHICLES.len()];

        let request = NewAppointment {
            customer: CustomerInfo {
                name: customer.to_string(),
                email: format!("{}@example.com", customer.to_lowercase().replace(' ', ".")),
                phone: Some(format!("555-{:04}", index)),
            },
            vehicle: VehicleDetails {
                make: make.to_string(),
                model: model.to_string(),
                year: 2012 + (index % 12) as u16,
                license_plate: format!("GRG-{:03}", index),
                mileage: 20_000 + (index as u32 * 3_711) % 120_000,
            },
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            service_cost_cents: service.price_cents,
            scheduled_date: date,
            scheduled_time: slots[index % slots.len()],
            work_notes: None,
        };

        let appointment = match shop.appointments().book(request) {
            Ok(appointment) => appointment,
            Err(e) => {
                eprintln!("Failed to book #{}: {}", index, e);
                continue;
            }
        };
        booked += 1;

        let id = appointment.id.as_str();
        let parts_cents = ((index * 1_250) % 6_000) as i64;
        match index % 5 {
            0 => {}
            1 => {
                shop.appointments().update_status(
                    id,
                    AppointmentUpdate::to(AppointmentStatus::InProgress).with_notes("On the lift"),
                )?;
            }
            2 | 3 => {
                shop.appointments()
                    .update_status(id, AppointmentUpdate::to(AppointmentStatus::InProgress))?;
                let done = shop.appointments().update_status(
                    id,
                    AppointmentUpdate::to(AppointmentStatus::Completed)
                        .with_parts_cost(parts_cents),
                )?;

                let payment = shop.payments().create(&NewPayment {
                    appointment_id: Some(done.id.clone()),
                    service_cost_cents: service.price_cents,
                    parts_cost_cents: parts_cents,
                    tax_amount_cents: done.total_cost_cents * 825 / 10_000,
                    ..NewPayment::default()
                })?;
                let amount = if index % 5 == 2 {
                    payment.amount_due_cents
                } else {
                    payment.amount_due_cents / 2
                };
                if amount > 0 {
                    shop.payments().record_payment(&payment.id, amount)?;
                }

                let rating = 3 + (index % 3) as u8;
                shop.add_testimonial(rating, service.name.as_str())?;
            }
            _ => {
                shop.appointments()
                    .update_status(id, AppointmentUpdate::to(AppointmentStatus::Cancelled))?;
            }
        }
    }

    println!("✓ Booked {} appointments", booked);
    println!();

    let registry = shop.registry().stats()?;
    println!("Tracking codes: {} issued", registry.total);
    if let Some(latest) = registry.recent_codes.first() {
        println!(
            "  Latest: {} ({})",
            latest.tracking_code.display_form(),
            latest.customer_name
        );
    }
    println!();

    println!("Shop metrics:");
    println!("{}", serde_json::to_string_pretty(&shop.metrics()?)?);
    println!();
    println!("Payment stats:");
    println!("{}", serde_json::to_string_pretty(&shop.payments().stats()?)?);
    println!();
    println!("Service stats:");
    println!("{}", serde_json::to_string_pretty(&shop.service_stats(&catalog)?)?);
    println!();
    println!("Overview:");
    println!("{}", serde_json::to_string_pretty(&shop.overview()?)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
