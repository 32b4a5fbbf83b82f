//! Consumption-projection engine for home heating oil.
//!
//! This crate turns sparse manual gauge readings, recorded fuel deliveries
//! and daily weather into a measured fuel efficiency (liters per heating
//! degree day), a projected current tank level, and a forward simulation that
//! predicts when the tank will need a refill. It also provides the clients
//! for the two external weather sources: the Open-Meteo forecast API and the
//! MSC Datamart observation archive.
//!
//! # Components
//!
//! - [`calc`]: pure conversion and cost formulas
//! - [`efficiency`]: L/HDD estimation and period reports
//! - [`tank`]: reconstruction of the current tank level
//! - [`predict`]: the day-by-day refill simulator
//! - [`scenarios`]: predictions under fixed weather assumptions
//! - [`costs`], [`hvac`], [`readings`]: reporting built on the above
//! - [`forecast`], [`observations`]: weather fetchers with retry and timeouts
//!
//! All computation takes "today" as an explicit argument; nothing reads the
//! clock except the fetchers stamping their results.
//!
//! # Quick Start
//!
//! ```
//! use fueltrack_core::mock::{MemoryHistory, reading};
//! use fueltrack_core::{HddSource, RefillPredictor, TankReconstructor};
//! use time::macros::date;
//!
//! let history = MemoryHistory::new().with_reading(reading(date!(2025 - 01 - 10), 60.0));
//! let today = date!(2025 - 01 - 12);
//!
//! let state = TankReconstructor::default()
//!     .reconstruct(&history, today)
//!     .unwrap()
//!     .expect("one reading exists");
//! let prediction = RefillPredictor::default().predict(
//!     state.projection.liters,
//!     state.efficiency,
//!     HddSource::Constant(38.0),
//!     today,
//! );
//! assert_eq!(prediction.days_until_refill, Some(27));
//! ```

pub mod calc;
pub mod costs;
pub mod efficiency;
pub mod error;
pub mod forecast;
pub mod hvac;
pub mod mock;
pub mod observations;
pub mod predict;
pub mod readings;
pub mod retry;
pub mod scenarios;
pub mod tank;
pub mod traits;

pub use calc::FillCost;
pub use costs::CostAnalysis;
pub use efficiency::{Period, PeriodEfficiency, WeatherStats};
pub use error::{Error, Result};
pub use forecast::{Forecast, ForecastConfig, ForecastDay, OpenMeteoClient};
pub use hvac::{HvacEfficiency, HvacEntry};
pub use observations::{
    DatamartConfig, DatamartImporter, ImportReport, Observation, StationMatcher, UrlStrategy,
    import_range,
};
pub use predict::{Fallback, HddSource, Outcome, Prediction, RefillPredictor, TrajectoryDay};
pub use readings::ReadingInterval;
pub use retry::{Backoff, RetryConfig, with_retry};
pub use scenarios::{Scenario, ScenarioKind};
pub use tank::{EfficiencySource, Projection, SinceFill, TankReconstructor, TankState};
pub use traits::{ForecastProvider, ObservationProvider};

// Re-export from fueltrack-types
pub use fueltrack_types::{
    DateRange, FuelFill, FuelHistory, GaugeReading, HddSummary, HvacReport, WeatherDay,
    WeatherSource,
};
