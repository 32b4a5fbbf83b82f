//! Local persistence for heating-oil records.
//!
//! This crate provides SQLite-based storage for gauge readings, fuel fills,
//! daily weather, monthly HVAC reports and settings, plus the range-sum
//! queries the projection engine needs. [`Store`] implements
//! [`fueltrack_types::FuelHistory`].
//!
//! # Example
//!
//! ```
//! use fueltrack_store::Store;
//! use fueltrack_types::NewGaugeReading;
//! use time::macros::date;
//!
//! let store = Store::open_in_memory()?;
//! store.insert_reading(&NewGaugeReading {
//!     date: date!(2025 - 01 - 10),
//!     gauge_percent: 55.0,
//!     notes: None,
//! })?;
//!
//! let latest = store.latest_reading()?;
//! assert_eq!(latest.map(|r| r.gauge_percent), Some(55.0));
//! # Ok::<(), fueltrack_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::SettingsSnapshot;
pub use queries::WeatherQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/fueltrack/fuel_tracker.db`
/// - macOS: `~/Library/Application Support/fueltrack/fuel_tracker.db`
/// - Windows: `C:\Users\<user>\AppData\Local\fueltrack\fuel_tracker.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("fueltrack")
        .join("fuel_tracker.db")
}
