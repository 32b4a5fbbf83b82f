//! HTTP REST API and weather sync service for heating-oil tracking.
//!
//! This crate provides a service that:
//! - Records gauge readings, fuel fills, daily weather and HVAC reports
//! - Backfills daily weather observations on a schedule
//! - Projects the current tank level and predicts the next refill
//! - Exposes everything as a JSON REST API
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET|POST /api/readings`, `GET|PUT|DELETE /api/readings/{id}` - Gauge readings
//! - `GET|POST /api/fills`, `GET|PUT|DELETE /api/fills/{id}` - Fuel fills
//! - `GET|POST /api/weather`, `DELETE /api/weather/{date}` - Daily weather
//! - `GET /api/weather/summary?from=&to=` - Weather statistics
//! - `POST /api/weather/fetch` - Import observations for a date range
//! - `GET|POST /api/hvac`, `GET|DELETE /api/hvac/{year}/{month}` - HVAC reports
//! - `GET /api/hvac/analysis/efficiency` - Runtime against fuel and HDD
//! - `GET /api/analysis/current` - Projected tank level and efficiency
//! - `GET /api/analysis/predictions` - Forecast-driven refill prediction
//! - `GET /api/analysis/efficiency` - Efficiency for a period
//! - `GET /api/analysis/costs` - Spending summary
//! - `GET /api/settings`, `PUT /api/settings/{key}` - Runtime settings
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/fueltrack/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3001"
//!
//! [tank]
//! capacity_liters = 1000.0
//! refill_threshold_percent = 20.0
//!
//! [weather]
//! station_id = "ZSM"
//! latitude = 60.0
//! longitude = -111.9
//!
//! [sync]
//! enabled = true
//! interval_secs = 3600
//! ```
//!
//! Tank capacity, discount and GST rate are seeded into the settings table
//! on first start; afterwards the stored values win.

pub mod api;
pub mod config;
pub mod state;
pub mod sync;

pub use config::{
    Config, ConfigError, PricingConfig, ServerConfig, StorageConfig, SyncConfig, TankConfig,
    ValidationError, WeatherConfig,
};
pub use state::{AppState, SyncState};
pub use sync::{SyncError, WeatherSync};
